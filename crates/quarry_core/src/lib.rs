//! # Quarry Core
//!
//! Identity-aware data access over a pluggable store backend.
//!
//! This crate provides:
//! - A generic [`Repository`] façade with composed reads (filter, sort,
//!   pagination, includes) and tracked writes
//! - A textual filter/sort expression language compiled against per-entity
//!   field accessors
//! - An identity-keyed [`ChangeTracker`] reconciling pending mutations
//! - A shared [`StoreContext`] carrying the tracker and the single ambient
//!   transaction across every repository bound to it

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod entity;
mod error;
mod paginate;
pub mod query;
mod relation;
mod repository;
mod tracking;
mod transaction;

pub use context::StoreContext;
pub use entity::{Entity, EntityKey, FieldMap, FieldSpec, FieldValue};
pub use error::{CoreError, CoreResult};
pub use paginate::PaginatedResult;
pub use query::{Filter, Query, Window};
pub use relation::Relation;
pub use repository::Repository;
pub use tracking::{ChangeTracker, EntityState, TrackedEntry};
pub use transaction::{TransactionCoordinator, TransactionHandle};
