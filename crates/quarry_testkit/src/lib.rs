//! # Quarry Testkit
//!
//! Test utilities for Quarry.
//!
//! This crate provides:
//! - Domain fixtures (employees, punches, audit notes) and seeded-context
//!   helpers over the in-memory backend
//! - A fault-injecting backend for failure-path tests
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quarry_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_seeded_repository() {
//!     let repo = seeded_employees(&[employee("ada", 36)]).await;
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fault::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::*;
