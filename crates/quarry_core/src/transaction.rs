//! Ambient transaction coordination.
//!
//! One coordinator lives in each store context and guards the single
//! ambient transaction for that context. Every repository constructed over
//! the context shares it, so a transaction begun through one repository is
//! visible to and committable through any other bound to the same context.

use crate::error::{CoreError, CoreResult};
use parking_lot::Mutex;
use quarry_store::{StoreBackend, TxnToken};
use uuid::Uuid;

/// The open ambient transaction of a store context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    /// Caller-supplied transaction id.
    pub id: Uuid,
    /// The underlying backend transaction resource.
    pub token: TxnToken,
}

/// Coordinates the single ambient transaction of one store context.
///
/// Nested transactions are rejected; commit and rollback must be keyed with
/// the id the transaction was begun under. If the backend fails during
/// commit or rollback the handle stays registered, leaving the caller free
/// to retry or roll back - this layer adds no cleanup of its own.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    current: Mutex<Option<TransactionHandle>>,
}

impl TransactionCoordinator {
    /// Creates a coordinator with no open transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the ambient transaction under the caller's id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransactionAlreadyOpen`] if one is already open
    /// for this context, or the backend's error if `begin` fails.
    pub async fn begin(&self, id: Uuid, backend: &dyn StoreBackend) -> CoreResult<TransactionHandle> {
        if let Some(open) = *self.current.lock() {
            return Err(CoreError::TransactionAlreadyOpen { id: open.id });
        }

        let token = backend.begin().await?;
        let handle = TransactionHandle { id, token };
        *self.current.lock() = Some(handle);
        tracing::debug!(%id, token = %token, "transaction opened");
        Ok(handle)
    }

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoActiveTransaction`] when none is open, or
    /// [`CoreError::TransactionIdMismatch`] when `id` does not match the
    /// open transaction's id.
    pub async fn commit(&self, id: Uuid, backend: &dyn StoreBackend) -> CoreResult<()> {
        let handle = self.matching(id)?;
        backend.commit(handle.token).await?;
        *self.current.lock() = None;
        tracing::debug!(%id, "transaction committed");
        Ok(())
    }

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TransactionCoordinator::commit`].
    pub async fn rollback(&self, id: Uuid, backend: &dyn StoreBackend) -> CoreResult<()> {
        let handle = self.matching(id)?;
        backend.rollback(handle.token).await?;
        *self.current.lock() = None;
        tracing::debug!(%id, "transaction rolled back");
        Ok(())
    }

    /// Returns the open transaction, if any.
    #[must_use]
    pub fn current(&self) -> Option<TransactionHandle> {
        *self.current.lock()
    }

    fn matching(&self, id: Uuid) -> CoreResult<TransactionHandle> {
        match *self.current.lock() {
            None => Err(CoreError::NoActiveTransaction),
            Some(handle) if handle.id != id => Err(CoreError::TransactionIdMismatch {
                expected: handle.id,
                actual: id,
            }),
            Some(handle) => Ok(handle),
        }
    }
}
