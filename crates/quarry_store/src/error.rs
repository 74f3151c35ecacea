//! Error types for store backends.

use crate::backend::TxnToken;
use std::io;
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the underlying driver.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connectivity failure to the backing store.
    #[error("store connection failed: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },

    /// An insert targeted a key that already exists in the set.
    #[error("duplicate key {key} in set '{set}'")]
    DuplicateKey {
        /// The set where the conflict occurred.
        set: String,
        /// The conflicting key.
        key: Uuid,
    },

    /// An update or delete targeted a row that does not exist.
    #[error("row {key} not found in set '{set}'")]
    MissingRow {
        /// The set that was searched.
        set: String,
        /// The key that was not found.
        key: Uuid,
    },

    /// `begin` was called while a backend transaction is already active.
    #[error("a backend transaction is already active")]
    TransactionActive,

    /// Commit or rollback was called with a token the backend does not know.
    #[error("unknown transaction token {0}")]
    UnknownTransaction(TxnToken),
}

impl StoreError {
    /// Creates a connection failure error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(set: impl Into<String>, key: Uuid) -> Self {
        Self::DuplicateKey {
            set: set.into(),
            key,
        }
    }

    /// Creates a missing row error.
    pub fn missing_row(set: impl Into<String>, key: Uuid) -> Self {
        Self::MissingRow {
            set: set.into(),
            key,
        }
    }
}
