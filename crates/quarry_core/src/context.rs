//! The unit-of-work store context.

use crate::error::{CoreError, CoreResult};
use crate::tracking::ChangeTracker;
use crate::transaction::{TransactionCoordinator, TransactionHandle};
use parking_lot::{Mutex, MutexGuard};
use quarry_store::StoreBackend;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// The shared state of one logical unit of work.
///
/// A context owns the change tracker and the ambient transaction slot for
/// one store instance. Repositories are constructed over an `Arc` of the
/// context and thereby share both: a transaction begun through one
/// repository is committable through another, and the same logical row is
/// tracked at most once across all of them.
///
/// # Concurrency
///
/// One context belongs to exactly one execution context (typically one
/// request). It is not designed for concurrent use by multiple callers; no
/// locking is provided beyond what internal consistency needs, which is the
/// intended contract rather than an omission.
///
/// Cancellation: every I/O-bound method is async, and dropping the returned
/// future abandons the operation at its next suspension point. The fate of
/// an in-flight backend transaction under cancellation is whatever the
/// driver guarantees; no extra cleanup happens here.
pub struct StoreContext {
    backend: Arc<dyn StoreBackend>,
    tracker: Mutex<ChangeTracker>,
    coordinator: TransactionCoordinator,
    disposed: AtomicBool,
}

impl StoreContext {
    /// Creates a context over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            tracker: Mutex::new(ChangeTracker::new()),
            coordinator: TransactionCoordinator::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn ensure_live(&self) -> CoreResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(CoreError::ContextDisposed);
        }
        Ok(())
    }

    pub(crate) fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }

    pub(crate) fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock()
    }

    /// Number of currently tracked entries, across all sets.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracker.lock().len()
    }

    /// Persists all pending tracked mutations as one atomic save.
    ///
    /// Returns the affected-row count. On success the tracker settles:
    /// added and modified entries become unchanged, deleted entries drop.
    ///
    /// # Errors
    ///
    /// A duplicate row the store detects surfaces as
    /// [`CoreError::IdentityConflict`]; every other persistence error
    /// propagates unchanged, with no retry at this layer.
    pub async fn save_changes(&self) -> CoreResult<u64> {
        self.ensure_live()?;

        let changes = self.tracker.lock().pending();
        if changes.is_empty() {
            return Ok(0);
        }

        let affected = self
            .backend
            .apply(&changes)
            .await
            .map_err(CoreError::from_save)?;
        self.tracker.lock().mark_saved();
        tracing::debug!(affected, "pending changes saved");
        Ok(affected)
    }

    /// Opens the ambient transaction under the caller's id.
    ///
    /// # Errors
    ///
    /// See [`TransactionCoordinator::begin`].
    pub async fn begin_transaction(&self, id: Uuid) -> CoreResult<TransactionHandle> {
        self.ensure_live()?;
        self.coordinator.begin(id, self.backend.as_ref()).await
    }

    /// Commits the ambient transaction.
    ///
    /// # Errors
    ///
    /// See [`TransactionCoordinator::commit`].
    pub async fn commit(&self, id: Uuid) -> CoreResult<()> {
        self.ensure_live()?;
        self.coordinator.commit(id, self.backend.as_ref()).await
    }

    /// Rolls back the ambient transaction.
    ///
    /// # Errors
    ///
    /// See [`TransactionCoordinator::rollback`].
    pub async fn rollback(&self, id: Uuid) -> CoreResult<()> {
        self.ensure_live()?;
        self.coordinator.rollback(id, self.backend.as_ref()).await
    }

    /// Returns the open ambient transaction, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<TransactionHandle> {
        self.coordinator.current()
    }

    /// Releases the context. Idempotent.
    ///
    /// Tracked state is dropped; subsequent operations fail with
    /// [`CoreError::ContextDisposed`].
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.tracker.lock().clear();
            tracing::debug!("store context disposed");
        }
    }

    /// True once the context has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("tracked", &self.tracked_count())
            .field("transaction", &self.transaction())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
