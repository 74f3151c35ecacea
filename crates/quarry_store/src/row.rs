//! Row types exchanged with store backends.

use uuid::Uuid;

/// A stored row.
///
/// Rows are opaque JSON values at this level. The data-access layer encodes
/// entities into rows and decodes them back; backends never interpret the
/// fields.
pub type Row = serde_json::Value;

/// A pending row mutation, produced by the change tracker at save time.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    /// Insert a new row under `key`.
    Insert {
        /// Target set name.
        set: String,
        /// Row key.
        key: Uuid,
        /// Row payload.
        row: Row,
    },
    /// Replace the row stored under `key`.
    Update {
        /// Target set name.
        set: String,
        /// Row key.
        key: Uuid,
        /// New row payload.
        row: Row,
    },
    /// Delete the row stored under `key`.
    Delete {
        /// Target set name.
        set: String,
        /// Row key.
        key: Uuid,
    },
}

impl RowChange {
    /// Creates an insert change.
    pub fn insert(set: impl Into<String>, key: Uuid, row: Row) -> Self {
        Self::Insert {
            set: set.into(),
            key,
            row,
        }
    }

    /// Creates an update change.
    pub fn update(set: impl Into<String>, key: Uuid, row: Row) -> Self {
        Self::Update {
            set: set.into(),
            key,
            row,
        }
    }

    /// Creates a delete change.
    pub fn delete(set: impl Into<String>, key: Uuid) -> Self {
        Self::Delete {
            set: set.into(),
            key,
        }
    }

    /// Returns the target set name.
    #[must_use]
    pub fn set(&self) -> &str {
        match self {
            Self::Insert { set, .. } | Self::Update { set, .. } | Self::Delete { set, .. } => set,
        }
    }

    /// Returns the row key.
    #[must_use]
    pub fn key(&self) -> Uuid {
        match self {
            Self::Insert { key, .. } | Self::Update { key, .. } | Self::Delete { key, .. } => *key,
        }
    }
}
