//! Paginated result wrapper.

use serde::{Deserialize, Serialize};

/// One page of matching rows plus the total match count.
///
/// Invariant: `total >= items.len()`. The items window and the total are
/// produced by two executions of the same filter; under concurrent writers
/// they may drift apart, which callers accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The rows of the requested page, at most one page size of them.
    pub items: Vec<T>,
    /// Total count of all matches under the same filter.
    pub total: u64,
    /// 1-based page number this window corresponds to.
    pub page: u64,
}

impl<T> PaginatedResult<T> {
    /// Creates a paginated result.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, page: u64) -> Self {
        Self { items, total, page }
    }
}
