//! Store backend trait definition.

use crate::error::StoreResult;
use crate::row::{Row, RowChange};
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// Identifier for an open backend transaction.
///
/// Tokens are minted by [`StoreBackend::begin`] and are only meaningful to
/// the backend that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnToken(pub u64);

impl TxnToken {
    /// Creates a new token from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// A backing store for the data-access layer.
///
/// Backends supply a queryable row sequence per entity set, an atomic save
/// of pending row changes, and one ambient transaction. They are **opaque
/// row stores**: the layer above owns entity encoding, identity
/// reconciliation, and query composition.
///
/// # Invariants
///
/// - `scan` returns rows in insertion (natural) order
/// - `apply` is all-or-nothing: either every change lands or none do
/// - At most one transaction is open per backend at any time
/// - Changes applied while a transaction is open become permanent on
///   `commit` and are undone by `rollback`
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - in-memory reference implementation
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Returns every row of `set` in natural order.
    ///
    /// Scanning a set that has never been written yields an empty sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to read.
    async fn scan(&self, set: &str) -> StoreResult<Vec<(Uuid, Row)>>;

    /// Applies a batch of row changes atomically.
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An insert targets an existing key ([`super::StoreError::DuplicateKey`])
    /// - An update or delete targets a missing row ([`super::StoreError::MissingRow`])
    /// - The driver fails; no change from the batch is applied in any error case
    async fn apply(&self, changes: &[RowChange]) -> StoreResult<u64>;

    /// Opens the ambient backend transaction.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::TransactionActive`] if one is already open.
    async fn begin(&self) -> StoreResult<TxnToken>;

    /// Commits the open transaction identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::UnknownTransaction`] if `token` does not
    /// identify the open transaction.
    async fn commit(&self, token: TxnToken) -> StoreResult<()>;

    /// Rolls back the open transaction identified by `token`, undoing every
    /// change applied since `begin`.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::UnknownTransaction`] if `token` does not
    /// identify the open transaction.
    async fn rollback(&self, token: TxnToken) -> StoreResult<()>;
}
