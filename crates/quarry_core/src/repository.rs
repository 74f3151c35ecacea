//! Generic repository over a store context.

use crate::context::StoreContext;
use crate::entity::{Entity, FieldMap};
use crate::error::{CoreError, CoreResult};
use crate::paginate::PaginatedResult;
use crate::query::compile::{CompiledFilter, CompiledSort};
use crate::query::parser::{parse_filter, parse_sort};
use crate::query::plan::{Filter, Query, Window};
use crate::relation::Relation;
use crate::transaction::TransactionHandle;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// An async per-entity loader hook.
type LoaderFn<T> =
    Arc<dyn for<'a> Fn(&'a mut T, &'a StoreContext) -> BoxFuture<'a, CoreResult<()>> + Send + Sync>;

/// A generic repository for entity type `T`.
///
/// The repository is a façade over one shared [`StoreContext`]: reads go
/// through the query composition pipeline, writes reconcile against the
/// context's change tracker by identity, and the transaction methods pass
/// through to the context's single ambient transaction. Domain repositories
/// are just constructions of this type over their aggregate:
///
/// ```rust,ignore
/// let ctx = Arc::new(StoreContext::new(backend));
/// let employees = Repository::<Employee>::new(ctx.clone())
///     .with_relation(Employee::punches_relation());
/// let notes = Repository::<AuditNote>::new(ctx);
/// ```
///
/// Reads ending in `_expr` take the textual filter/sort language; their
/// typed counterparts take host-language predicates. Untracked reads never
/// touch the tracker; `get_tracked`/`list_tracked` attach what they return
/// as `Unchanged` so a later field edit plus [`Repository::update`] diffs.
pub struct Repository<T: Entity> {
    ctx: Arc<StoreContext>,
    fields: FieldMap<T>,
    relations: Vec<Relation<T>>,
    reference_loader: Option<LoaderFn<T>>,
    detail_loader: Option<LoaderFn<T>>,
}

impl<T: Entity> Repository<T> {
    /// Creates a repository bound to a store context.
    ///
    /// The entity's field-accessor map is built here, once.
    #[must_use]
    pub fn new(ctx: Arc<StoreContext>) -> Self {
        Self {
            ctx,
            fields: FieldMap::of(),
            relations: Vec::new(),
            reference_loader: None,
            detail_loader: None,
        }
    }

    /// Registers a relation answering an include path.
    #[must_use]
    pub fn with_relation(mut self, relation: Relation<T>) -> Self {
        self.relations.push(relation);
        self
    }

    /// Registers the optional `load_references` override.
    #[must_use]
    pub fn with_reference_loader<F>(mut self, loader: F) -> Self
    where
        F: for<'a> Fn(&'a mut T, &'a StoreContext) -> BoxFuture<'a, CoreResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.reference_loader = Some(Arc::new(loader));
        self
    }

    /// Registers the optional `load_details` override.
    #[must_use]
    pub fn with_detail_loader<F>(mut self, loader: F) -> Self
    where
        F: for<'a> Fn(&'a mut T, &'a StoreContext) -> BoxFuture<'a, CoreResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.detail_loader = Some(Arc::new(loader));
        self
    }

    /// The store context this repository operates on.
    #[must_use]
    pub fn context(&self) -> &Arc<StoreContext> {
        &self.ctx
    }

    // ---- reads ---------------------------------------------------------

    /// Returns the first match in natural store order, untracked.
    pub async fn get<F>(&self, filter: F, includes: &[&str]) -> CoreResult<Option<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.first(Some(Filter::predicate(filter)), None, includes, false)
            .await
    }

    /// Returns the first match under a sort spec, untracked.
    pub async fn get_sorted<F>(&self, sort: &str, filter: F, includes: &[&str]) -> CoreResult<Option<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let sort = self.compile_sort(sort)?;
        self.first(Some(Filter::predicate(filter)), sort, includes, false)
            .await
    }

    /// Returns the first match and attaches it as `Unchanged`.
    pub async fn get_tracked<F>(&self, filter: F, includes: &[&str]) -> CoreResult<Option<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.first(Some(Filter::predicate(filter)), None, includes, true)
            .await
    }

    /// Returns the first match under a sort spec and attaches it as
    /// `Unchanged`.
    pub async fn get_tracked_sorted<F>(
        &self,
        sort: &str,
        filter: F,
        includes: &[&str],
    ) -> CoreResult<Option<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let sort = self.compile_sort(sort)?;
        self.first(Some(Filter::predicate(filter)), sort, includes, true)
            .await
    }

    /// Lists every match in natural store order, untracked.
    pub async fn list<F>(&self, filter: F, includes: &[&str]) -> CoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.select(Some(Filter::predicate(filter)), None, None, includes, false)
            .await
    }

    /// Lists every match under a sort spec, untracked.
    pub async fn list_sorted<F>(&self, sort: &str, filter: F, includes: &[&str]) -> CoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let sort = self.compile_sort(sort)?;
        self.select(Some(Filter::predicate(filter)), sort, None, includes, false)
            .await
    }

    /// Lists every match and attaches each as `Unchanged`.
    pub async fn list_tracked<F>(&self, filter: F, includes: &[&str]) -> CoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.select(Some(Filter::predicate(filter)), None, None, includes, true)
            .await
    }

    /// Lists matches of a textual filter under a textual sort spec.
    ///
    /// An empty filter selects everything; an empty sort keeps natural
    /// store order. A malformed expression fails with a parse error naming
    /// the offending fragment - it never degrades into an empty list.
    pub async fn list_expr(&self, filter: &str, sort: &str, includes: &[&str]) -> CoreResult<Vec<T>> {
        let filter = self.compile_text_filter(filter)?;
        let sort = self.compile_sort(sort)?;
        self.select(filter, sort, None, includes, false).await
    }

    /// Returns one page of matches plus the total match count.
    ///
    /// The filter is executed twice - windowed for the items, unwindowed
    /// for the total. The two executions are not atomic with respect to
    /// concurrent writers.
    pub async fn paginate<F>(
        &self,
        filter: F,
        sort: &str,
        page: u64,
        page_size: u64,
        includes: &[&str],
    ) -> CoreResult<PaginatedResult<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.paginate_with(Some(Filter::predicate(filter)), sort, page, page_size, includes)
            .await
    }

    /// [`Repository::paginate`] with a textual filter.
    pub async fn paginate_expr(
        &self,
        filter: &str,
        sort: &str,
        page: u64,
        page_size: u64,
        includes: &[&str],
    ) -> CoreResult<PaginatedResult<T>> {
        let filter = self.compile_text_filter(filter)?;
        self.paginate_with(filter, sort, page, page_size, includes)
            .await
    }

    /// Counts all rows of the set.
    pub async fn count(&self) -> CoreResult<u64> {
        self.ctx.ensure_live()?;
        Ok(self.ctx.backend().scan(T::SET).await?.len() as u64)
    }

    /// Counts rows matching a typed predicate.
    pub async fn count_where<F>(&self, filter: F) -> CoreResult<u64>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let items = self.fetch_all().await?;
        Ok(Query::new()
            .with_filter(Some(Filter::predicate(filter)))
            .count(&items))
    }

    /// Counts rows matching a textual filter; an empty filter counts all.
    pub async fn count_expr(&self, filter: &str) -> CoreResult<u64> {
        match self.compile_text_filter(filter)? {
            None => self.count().await,
            Some(filter) => {
                let items = self.fetch_all().await?;
                Ok(Query::new().with_filter(Some(filter)).count(&items))
            }
        }
    }

    // ---- writes --------------------------------------------------------

    /// Marks an entity for insertion, reconciling by identity.
    ///
    /// # Errors
    ///
    /// Fails if the entity cannot be encoded or the context is disposed.
    pub fn add(&self, entity: &T) -> CoreResult<()> {
        self.ctx.ensure_live()?;
        let row = serde_json::to_value(entity)?;
        self.ctx.tracker().add(T::SET, entity.identity(), row);
        Ok(())
    }

    /// Marks an entity for update, reconciling by identity.
    ///
    /// # Errors
    ///
    /// Fails if the entity cannot be encoded or the context is disposed.
    pub fn update(&self, entity: &T) -> CoreResult<()> {
        self.ctx.ensure_live()?;
        let row = serde_json::to_value(entity)?;
        self.ctx.tracker().update(T::SET, entity.identity(), row);
        Ok(())
    }

    /// Marks an entity for deletion, reconciling by identity.
    ///
    /// # Errors
    ///
    /// Fails if the entity cannot be encoded or the context is disposed.
    pub fn remove(&self, entity: &T) -> CoreResult<()> {
        self.ctx.ensure_live()?;
        let row = serde_json::to_value(entity)?;
        self.ctx.tracker().remove(T::SET, entity.identity(), row);
        Ok(())
    }

    /// Marks a batch of entities for deletion, one by one.
    ///
    /// # Errors
    ///
    /// Fails on the first entity that cannot be encoded.
    pub fn remove_all(&self, entities: &[T]) -> CoreResult<()> {
        for entity in entities {
            self.remove(entity)?;
        }
        Ok(())
    }

    /// True when an entity with this identity is currently tracked.
    pub fn is_tracked(&self, entity: &T) -> CoreResult<bool> {
        self.ctx.ensure_live()?;
        Ok(self.ctx.tracker().is_tracked(T::SET, entity.identity()))
    }

    /// Attaches an entity as `Unchanged` to prime in-place edits.
    ///
    /// # Errors
    ///
    /// Fails if the entity cannot be encoded or the context is disposed.
    pub fn track(&self, entity: &T) -> CoreResult<()> {
        self.ctx.ensure_live()?;
        let row = serde_json::to_value(entity)?;
        self.ctx.tracker().track(T::SET, entity.identity(), row);
        Ok(())
    }

    // ---- persistence & transactions ------------------------------------

    /// Persists all pending tracked mutations. See
    /// [`StoreContext::save_changes`].
    pub async fn save_changes(&self) -> CoreResult<u64> {
        self.ctx.save_changes().await
    }

    /// Opens the shared ambient transaction under `id`.
    pub async fn begin_transaction(&self, id: Uuid) -> CoreResult<()> {
        self.ctx.begin_transaction(id).await.map(|_| ())
    }

    /// Commits the shared ambient transaction.
    pub async fn commit(&self, id: Uuid) -> CoreResult<()> {
        self.ctx.commit(id).await
    }

    /// Rolls back the shared ambient transaction.
    pub async fn rollback(&self, id: Uuid) -> CoreResult<()> {
        self.ctx.rollback(id).await
    }

    /// Returns the open ambient transaction, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<TransactionHandle> {
        self.ctx.transaction()
    }

    /// Disposes the underlying store context. Idempotent.
    pub fn dispose(&self) {
        self.ctx.dispose();
    }

    // ---- optional per-entity overrides ---------------------------------

    /// Loads an entity's reference navigations via the registered override.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotImplemented`] when no override was
    /// registered - a programming error, not a recoverable condition.
    pub async fn load_references(&self, entity: &mut T) -> CoreResult<()> {
        match &self.reference_loader {
            Some(loader) => loader(entity, &self.ctx).await,
            None => Err(CoreError::not_implemented("load_references")),
        }
    }

    /// Loads an entity's detail collections via the registered override.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotImplemented`] when no override was
    /// registered.
    pub async fn load_details(&self, entity: &mut T) -> CoreResult<()> {
        match &self.detail_loader {
            Some(loader) => loader(entity, &self.ctx).await,
            None => Err(CoreError::not_implemented("load_details")),
        }
    }

    // ---- internals -----------------------------------------------------

    async fn fetch_all(&self) -> CoreResult<Vec<T>> {
        self.ctx.ensure_live()?;
        let rows = self.ctx.backend().scan(T::SET).await?;
        rows.into_iter()
            .map(|(_, row)| serde_json::from_value(row).map_err(CoreError::from))
            .collect()
    }

    async fn first(
        &self,
        filter: Option<Filter<T>>,
        sort: Option<CompiledSort<T>>,
        includes: &[&str],
        track: bool,
    ) -> CoreResult<Option<T>> {
        let mut selected = self.select(filter, sort, None, includes, false).await?;
        selected.truncate(1);
        let entity = selected.pop();
        if track {
            if let Some(entity) = &entity {
                self.track(entity)?;
            }
        }
        Ok(entity)
    }

    async fn select(
        &self,
        filter: Option<Filter<T>>,
        sort: Option<CompiledSort<T>>,
        window: Option<Window>,
        includes: &[&str],
        track: bool,
    ) -> CoreResult<Vec<T>> {
        let items = self.fetch_all().await?;
        let mut query = Query::new().with_filter(filter).with_sort(sort);
        if let Some(window) = window {
            query = query.with_window(window);
        }
        let mut selected = query.apply(items);

        self.load_includes(&mut selected, includes).await?;
        if track {
            for entity in &selected {
                self.track(entity)?;
            }
        }
        Ok(selected)
    }

    async fn paginate_with(
        &self,
        filter: Option<Filter<T>>,
        sort: &str,
        page: u64,
        page_size: u64,
        includes: &[&str],
    ) -> CoreResult<PaginatedResult<T>> {
        let window = Window::new(page, page_size)?;
        let sort = self.compile_sort(sort)?;

        // First execution: the windowed item query.
        let items = self
            .select(filter.clone(), sort, Some(window), includes, false)
            .await?;
        // Second execution: the unwindowed total under the same filter.
        let all = self.fetch_all().await?;
        let total = Query::new().with_filter(filter).count(&all);

        Ok(PaginatedResult::new(items, total, page))
    }

    /// Fetches each included relation as its own separate query and merges
    /// the rows onto the primaries by identity (split-query mode). With no
    /// includes there is no split overhead at all.
    async fn load_includes(&self, primaries: &mut [T], includes: &[&str]) -> CoreResult<()> {
        if includes.is_empty() {
            return Ok(());
        }

        let relations = includes
            .iter()
            .map(|path| {
                self.relations
                    .iter()
                    .find(|r| r.path() == *path)
                    .ok_or_else(|| CoreError::unknown_relation(*path))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        for relation in relations {
            let related = self.ctx.backend().scan(relation.set()).await?;
            relation.merge(primaries, related)?;
        }
        Ok(())
    }

    fn compile_text_filter(&self, input: &str) -> CoreResult<Option<Filter<T>>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        let expr = parse_filter(input)?;
        let compiled = CompiledFilter::compile(&expr, &self.fields)?;
        Ok(Some(Filter::text(compiled)))
    }

    fn compile_sort(&self, input: &str) -> CoreResult<Option<CompiledSort<T>>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        let expr = parse_sort(input)?;
        Ok(Some(CompiledSort::compile(&expr, &self.fields)?))
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("set", &T::SET)
            .field("relations", &self.relations.len())
            .finish_non_exhaustive()
    }
}
