//! In-memory store backend.

use crate::backend::{StoreBackend, TxnToken};
use crate::error::{StoreError, StoreResult};
use crate::row::{Row, RowChange};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Rows per set, in insertion order.
type Tables = HashMap<String, Vec<(Uuid, Row)>>;

#[derive(Debug)]
struct OpenTxn {
    token: TxnToken,
    /// Table state at `begin`, restored on rollback.
    snapshot: Tables,
}

/// An in-memory store backend.
///
/// This backend keeps all rows in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral data that does not need persistence
///
/// Rows are kept in insertion order per set, which is the natural order
/// surfaced by `scan`. Transactions are snapshot-based: `begin` captures the
/// current tables, `rollback` restores them, `commit` discards the snapshot.
///
/// # Example
///
/// ```rust
/// use quarry_store::{MemoryBackend, RowChange, StoreBackend};
/// use uuid::Uuid;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// let key = Uuid::new_v4();
/// backend
///     .apply(&[RowChange::insert("tasks", key, serde_json::json!({"done": false}))])
///     .await
///     .unwrap();
/// let rows = backend.scan("tasks").await.unwrap();
/// assert_eq!(rows[0].0, key);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    open_txn: Mutex<Option<OpenTxn>>,
    next_token: AtomicU64,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every row from every set.
    pub fn clear(&self) {
        self.tables.write().clear();
    }

    /// Returns the number of rows currently stored in `set`.
    #[must_use]
    pub fn row_count(&self, set: &str) -> usize {
        self.tables.read().get(set).map_or(0, Vec::len)
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn scan(&self, set: &str) -> StoreResult<Vec<(Uuid, Row)>> {
        Ok(self.tables.read().get(set).cloned().unwrap_or_default())
    }

    async fn apply(&self, changes: &[RowChange]) -> StoreResult<u64> {
        let mut tables = self.tables.write();

        // Stage the batch on a copy so a mid-batch failure applies nothing.
        let mut staged = tables.clone();
        for change in changes {
            match change {
                RowChange::Insert { set, key, row } => {
                    let rows = staged.entry(set.clone()).or_default();
                    if rows.iter().any(|(k, _)| k == key) {
                        return Err(StoreError::duplicate_key(set.clone(), *key));
                    }
                    rows.push((*key, row.clone()));
                }
                RowChange::Update { set, key, row } => {
                    let rows = staged.entry(set.clone()).or_default();
                    match rows.iter_mut().find(|(k, _)| k == key) {
                        Some(slot) => slot.1 = row.clone(),
                        None => return Err(StoreError::missing_row(set.clone(), *key)),
                    }
                }
                RowChange::Delete { set, key } => {
                    let rows = staged.entry(set.clone()).or_default();
                    match rows.iter().position(|(k, _)| k == key) {
                        Some(index) => {
                            rows.remove(index);
                        }
                        None => return Err(StoreError::missing_row(set.clone(), *key)),
                    }
                }
            }
        }

        *tables = staged;
        Ok(changes.len() as u64)
    }

    async fn begin(&self) -> StoreResult<TxnToken> {
        let mut open = self.open_txn.lock();
        if open.is_some() {
            return Err(StoreError::TransactionActive);
        }

        let token = TxnToken::new(self.next_token.fetch_add(1, Ordering::SeqCst) + 1);
        *open = Some(OpenTxn {
            token,
            snapshot: self.tables.read().clone(),
        });
        Ok(token)
    }

    async fn commit(&self, token: TxnToken) -> StoreResult<()> {
        let mut open = self.open_txn.lock();
        match open.as_ref() {
            Some(txn) if txn.token == token => {
                *open = None;
                Ok(())
            }
            _ => Err(StoreError::UnknownTransaction(token)),
        }
    }

    async fn rollback(&self, token: TxnToken) -> StoreResult<()> {
        let mut open = self.open_txn.lock();
        match open.take() {
            Some(txn) if txn.token == token => {
                *self.tables.write() = txn.snapshot;
                Ok(())
            }
            other => {
                *open = other;
                Err(StoreError::UnknownTransaction(token))
            }
        }
    }
}
