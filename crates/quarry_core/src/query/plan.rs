//! Composed read queries: filter, sort, window.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::query::compile::{CompiledFilter, CompiledSort};
use std::fmt;
use std::sync::Arc;

/// A row filter: either a typed predicate or a compiled textual expression.
#[derive(Clone)]
pub enum Filter<T> {
    /// A host-language predicate.
    Predicate(Arc<dyn Fn(&T) -> bool + Send + Sync>),
    /// A compiled textual filter expression.
    Text(Arc<CompiledFilter<T>>),
}

impl<T: Entity> Filter<T> {
    /// Wraps a typed predicate.
    pub fn predicate(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Wraps a compiled textual filter.
    #[must_use]
    pub fn text(filter: CompiledFilter<T>) -> Self {
        Self::Text(Arc::new(filter))
    }

    /// Evaluates the filter against one entity.
    #[must_use]
    pub fn matches(&self, entity: &T) -> bool {
        match self {
            Self::Predicate(f) => f(entity),
            Self::Text(f) => f.matches(entity),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(_) => f.write_str("Filter::Predicate"),
            Self::Text(_) => f.write_str("Filter::Text"),
        }
    }
}

/// A 1-based paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// 1-based page number.
    pub page: u64,
    /// Rows per page.
    pub page_size: u64,
}

impl Window {
    /// Validates and creates a window.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPage`] when `page` or `page_size` is
    /// below 1.
    pub fn new(page: u64, page_size: u64) -> CoreResult<Self> {
        if page < 1 || page_size < 1 {
            return Err(CoreError::InvalidPage { page, page_size });
        }
        Ok(Self { page, page_size })
    }

    /// Rows to skip before the window starts.
    ///
    /// Saturates instead of overflowing; a window past any real sequence
    /// just selects nothing.
    #[must_use]
    pub fn skip(&self) -> usize {
        let skipped = (self.page - 1).saturating_mul(self.page_size);
        usize::try_from(skipped).unwrap_or(usize::MAX)
    }

    /// Maximum rows inside the window.
    #[must_use]
    pub fn take(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }
}

/// A composed read query over entity type `T`.
///
/// Applies, in order: filter, stable sort, paging window. A query with no
/// sort keeps the store's natural order; a query with no window returns
/// every match.
#[derive(Debug)]
pub struct Query<T> {
    filter: Option<Filter<T>>,
    sort: Option<CompiledSort<T>>,
    window: Option<Window>,
}

impl<T: Entity> Query<T> {
    /// Creates an empty query (unfiltered scan, natural order).
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: None,
            sort: None,
            window: None,
        }
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<Filter<T>>) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sort spec.
    #[must_use]
    pub fn with_sort(mut self, sort: Option<CompiledSort<T>>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the paging window.
    #[must_use]
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// Runs the query over an already-materialized sequence.
    #[must_use]
    pub fn apply(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(filter) = &self.filter {
            items.retain(|item| filter.matches(item));
        }
        if let Some(sort) = &self.sort {
            // Stable, so equal keys keep natural store order.
            items.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(window) = self.window {
            items = items
                .into_iter()
                .skip(window.skip())
                .take(window.take())
                .collect();
        }
        items
    }

    /// Counts matches without sorting or windowing.
    #[must_use]
    pub fn count(&self, items: &[T]) -> u64 {
        match &self.filter {
            Some(filter) => items.iter().filter(|item| filter.matches(item)).count() as u64,
            None => items.len() as u64,
        }
    }
}

impl<T: Entity> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{FieldMap, FieldSpec, FieldValue};
    use crate::query::parser::{parse_filter, parse_sort};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        n: i64,
    }

    impl Entity for Item {
        const SET: &'static str = "items";

        fn fields() -> &'static [FieldSpec<Self>] {
            const FIELDS: &[FieldSpec<Item>] = &[FieldSpec::new("n", |i| FieldValue::Int(i.n))];
            FIELDS
        }
    }

    fn items(range: std::ops::Range<i64>) -> Vec<Item> {
        range.map(|n| Item { n }).collect()
    }

    #[test]
    fn empty_query_is_identity() {
        let result = Query::new().apply(items(0..5));
        assert_eq!(result, items(0..5));
    }

    #[test]
    fn window_is_invalid_below_one() {
        assert!(matches!(
            Window::new(0, 10),
            Err(CoreError::InvalidPage { .. })
        ));
        assert!(matches!(
            Window::new(1, 0),
            Err(CoreError::InvalidPage { .. })
        ));
    }

    #[test]
    fn window_skips_and_takes() {
        let window = Window::new(2, 3).unwrap();
        let result = Query::new().with_window(window).apply(items(0..10));
        assert_eq!(result, items(3..6));
    }

    #[test]
    fn window_past_the_end_is_empty() {
        let window = Window::new(5, 10).unwrap();
        assert!(Query::new().with_window(window).apply(items(0..3)).is_empty());
    }

    #[test]
    fn extreme_window_saturates_instead_of_overflowing() {
        let window = Window::new(u64::MAX, u64::MAX).unwrap();
        assert_eq!(window.skip(), usize::MAX);
        assert!(Query::new().with_window(window).apply(items(0..3)).is_empty());
    }

    #[test]
    fn filter_sort_window_compose() {
        let map = FieldMap::of();
        let filter = Filter::text(
            crate::query::compile::CompiledFilter::compile(
                &parse_filter("n >= 2 && n < 8").unwrap(),
                &map,
            )
            .unwrap(),
        );
        let sort = crate::query::compile::CompiledSort::compile(
            &parse_sort("n desc").unwrap(),
            &map,
        )
        .unwrap();

        let query = Query::new()
            .with_filter(Some(filter))
            .with_sort(Some(sort))
            .with_window(Window::new(2, 2).unwrap());
        // Matches 2..8 sorted desc: 7 6 5 4 3 2 -> page 2 of 2: 5 4
        let result = query.apply(items(0..10));
        assert_eq!(result, vec![Item { n: 5 }, Item { n: 4 }]);
    }

    #[test]
    fn count_ignores_window() {
        let query = Query::new()
            .with_filter(Some(Filter::predicate(|i: &Item| i.n % 2 == 0)))
            .with_window(Window::new(1, 2).unwrap());
        assert_eq!(query.count(&items(0..10)), 5);
    }
}
