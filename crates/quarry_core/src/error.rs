//! Error types for the data-access layer.

use quarry_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for data-access operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the data-access layer.
///
/// Persistence errors from the backing store propagate unchanged through the
/// [`CoreError::Store`] variant; this layer never retries and never swallows
/// them. User-facing translation belongs to the boundary above.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The backing store reported a failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Entity encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A textual filter or sort expression is malformed.
    #[error("parse error at offset {offset}: {message} in `{fragment}`")]
    Parse {
        /// The offending fragment of the input.
        fragment: String,
        /// Byte offset of the fragment within the input.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// A transaction is already open for this store context.
    #[error("transaction {id} is already open")]
    TransactionAlreadyOpen {
        /// Id of the currently open transaction.
        id: Uuid,
    },

    /// Commit or rollback was requested with no open transaction.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// Commit or rollback was keyed with the wrong transaction id.
    #[error("transaction id mismatch: open {expected}, got {actual}")]
    TransactionIdMismatch {
        /// Id of the open transaction.
        expected: Uuid,
        /// Id the caller supplied.
        actual: Uuid,
    },

    /// The store detected a duplicate row for an identity this layer
    /// believed to be new.
    #[error("identity conflict: key {key} already exists in set '{set}'")]
    IdentityConflict {
        /// The set where the conflict occurred.
        set: String,
        /// The conflicting identity value.
        key: Uuid,
    },

    /// An optional per-entity override was called without being registered.
    #[error("not implemented: {operation}")]
    NotImplemented {
        /// Name of the missing override.
        operation: String,
    },

    /// An include path does not name a registered relation.
    #[error("unknown relation '{path}'")]
    UnknownRelation {
        /// The include path that failed to resolve.
        path: String,
    },

    /// Pagination was requested with a page or page size below 1.
    #[error("invalid page window: page {page}, page size {page_size}")]
    InvalidPage {
        /// Requested 1-based page number.
        page: u64,
        /// Requested page size.
        page_size: u64,
    },

    /// The store context has been disposed.
    #[error("store context is disposed")]
    ContextDisposed,
}

impl CoreError {
    /// Creates a parse error naming the offending fragment.
    pub fn parse(fragment: impl Into<String>, offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            fragment: fragment.into(),
            offset,
            message: message.into(),
        }
    }

    /// Creates a not-implemented error for an uncalled optional override.
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }

    /// Creates an unknown relation error.
    pub fn unknown_relation(path: impl Into<String>) -> Self {
        Self::UnknownRelation { path: path.into() }
    }

    /// Maps a save-time store failure, surfacing duplicate-key rejections as
    /// identity conflicts. Every other store error passes through unchanged.
    pub(crate) fn from_save(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { set, key } => Self::IdentityConflict { set, key },
            other => Self::Store(other),
        }
    }
}
