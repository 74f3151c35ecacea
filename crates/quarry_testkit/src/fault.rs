//! Fault-injecting store backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use quarry_store::{MemoryBackend, Row, RowChange, StoreBackend, StoreError, StoreResult, TxnToken};
use uuid::Uuid;

/// An in-memory backend with one-shot fault injection.
///
/// Arm a failure for the next `apply` or `begin` call; the armed error is
/// returned once and the backend behaves normally afterwards. Scans and
/// transaction completion are never faulted, which keeps failure tests
/// focused on the write and open paths.
#[derive(Debug, Default)]
pub struct FaultBackend {
    inner: MemoryBackend,
    next_apply_error: Mutex<Option<StoreError>>,
    next_begin_error: Mutex<Option<StoreError>>,
}

impl FaultBackend {
    /// Creates a backend with no faults armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms an error for the next `apply` call.
    pub fn fail_next_apply(&self, error: StoreError) {
        *self.next_apply_error.lock() = Some(error);
    }

    /// Arms an error for the next `begin` call.
    pub fn fail_next_begin(&self, error: StoreError) {
        *self.next_begin_error.lock() = Some(error);
    }

    /// The wrapped in-memory backend, for direct inspection.
    #[must_use]
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }
}

#[async_trait]
impl StoreBackend for FaultBackend {
    async fn scan(&self, set: &str) -> StoreResult<Vec<(Uuid, Row)>> {
        self.inner.scan(set).await
    }

    async fn apply(&self, changes: &[RowChange]) -> StoreResult<u64> {
        if let Some(error) = self.next_apply_error.lock().take() {
            return Err(error);
        }
        self.inner.apply(changes).await
    }

    async fn begin(&self) -> StoreResult<TxnToken> {
        if let Some(error) = self.next_begin_error.lock().take() {
            return Err(error);
        }
        self.inner.begin().await
    }

    async fn commit(&self, token: TxnToken) -> StoreResult<()> {
        self.inner.commit(token).await
    }

    async fn rollback(&self, token: TxnToken) -> StoreResult<()> {
        self.inner.rollback(token).await
    }
}
