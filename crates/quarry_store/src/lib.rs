//! # Quarry Store
//!
//! Store capability boundary for Quarry.
//!
//! This crate defines the contract the data-access layer requires of its
//! backing store: a queryable row sequence per entity set, an atomic save
//! of pending row changes, and begin/commit/rollback of one ambient
//! transaction. The layer above owns all entity semantics - backends deal
//! in opaque JSON rows keyed by UUID and do not understand entities,
//! filters, or change tracking.
//!
//! ## Design Principles
//!
//! - Backends are row stores (scan, apply, transaction primitives)
//! - No knowledge of entity types, identity reconciliation, or queries
//! - Must be `Send + Sync`; every operation is I/O-bound and async
//! - Dropping an in-flight future abandons the operation; backends perform
//!   whatever cleanup their driver guarantees, nothing more
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - In-memory reference implementation for testing and
//!   ephemeral use
//!
//! ## Example
//!
//! ```rust
//! use quarry_store::{MemoryBackend, RowChange, StoreBackend};
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = MemoryBackend::new();
//! let key = Uuid::new_v4();
//! backend
//!     .apply(&[RowChange::insert("users", key, serde_json::json!({"name": "Alice"}))])
//!     .await
//!     .unwrap();
//! assert_eq!(backend.scan("users").await.unwrap().len(), 1);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod row;

pub use backend::{StoreBackend, TxnToken};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use row::{Row, RowChange};
