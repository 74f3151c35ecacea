//! Identity-aware change tracking.
//!
//! One tracker lives in each store context and holds every entity the unit
//! of work currently knows about, across all sets. Write calls reconcile
//! against tracked state by identity before attaching anything, so the same
//! logical row is never tracked twice.
//!
//! Resolution is a linear scan over tracked entries - O(tracked count) per
//! write call, which is the intended trade for request-scoped units of work.
//! An index keyed by identity would be a behavior-preserving optimization.

use crate::entity::EntityKey;
use quarry_store::{Row, RowChange};

/// Pending-change state of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Materialized from the store, no pending change.
    Unchanged,
    /// Will be inserted on save.
    Added,
    /// Will be updated on save.
    Modified,
    /// Will be deleted on save.
    Deleted,
}

/// One tracked entity: identity, pending state, and current field values.
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    set: &'static str,
    key: EntityKey,
    state: EntityState,
    row: Row,
    /// True when the key was minted for an identity-less entity. Synthetic
    /// entries are internal bookkeeping and never resolve against writes.
    synthetic: bool,
}

impl TrackedEntry {
    /// The set this entry belongs to.
    #[must_use]
    pub fn set(&self) -> &'static str {
        self.set
    }

    /// The entry's identity value.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// The entry's pending-change state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// The entry's current field values.
    #[must_use]
    pub fn row(&self) -> &Row {
        &self.row
    }
}

/// The in-memory change-tracking set of one unit of work.
///
/// Invariant: at most one entry per (set, identity value). Identity-less
/// entities are attached under fresh synthetic keys and therefore never
/// collide or reconcile - they are always new.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: Vec<TrackedEntry>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tracked entries.
    #[must_use]
    pub fn entries(&self) -> &[TrackedEntry] {
        &self.entries
    }

    /// Number of tracked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the tracked entry with the given identity, if any.
    #[must_use]
    pub fn resolve(&self, set: &str, key: EntityKey) -> Option<&TrackedEntry> {
        self.entries
            .iter()
            .find(|e| !e.synthetic && e.set == set && e.key == key)
    }

    fn resolve_mut(&mut self, set: &str, key: EntityKey) -> Option<&mut TrackedEntry> {
        self.entries
            .iter_mut()
            .find(|e| !e.synthetic && e.set == set && e.key == key)
    }

    /// True when an entity with this identity is currently tracked.
    ///
    /// Entities lacking an identity value are never considered tracked.
    #[must_use]
    pub fn is_tracked(&self, set: &str, identity: Option<EntityKey>) -> bool {
        identity.is_some_and(|key| self.resolve(set, key).is_some())
    }

    fn attach(
        &mut self,
        set: &'static str,
        identity: Option<EntityKey>,
        row: Row,
        state: EntityState,
    ) -> EntityKey {
        let (key, synthetic) = match identity {
            Some(key) => (key, false),
            None => (EntityKey::new(), true),
        };
        self.entries.push(TrackedEntry {
            set,
            key,
            state,
            row,
            synthetic,
        });
        key
    }

    /// Marks an entity for insertion.
    ///
    /// If the identity already resolves to a tracked entry, that entry's
    /// field values are overwritten from `row` and its state becomes
    /// `Added` - this is how a previously removed identity is re-added
    /// within the same unit of work.
    pub fn add(&mut self, set: &'static str, identity: Option<EntityKey>, row: Row) -> EntityKey {
        if let Some(key) = identity {
            if let Some(entry) = self.resolve_mut(set, key) {
                entry.row = row;
                entry.state = EntityState::Added;
                return key;
            }
        }
        self.attach(set, identity, row, EntityState::Added)
    }

    /// Marks an entity for update.
    ///
    /// Copies field values onto the already-tracked entry when the identity
    /// resolves; otherwise attaches as `Modified`. An entry pending `Added`
    /// keeps its state - the row has not reached the store yet, so the
    /// pending change must stay an insert. Repeating an update is a state
    /// no-op.
    pub fn update(&mut self, set: &'static str, identity: Option<EntityKey>, row: Row) -> EntityKey {
        if let Some(key) = identity {
            if let Some(entry) = self.resolve_mut(set, key) {
                entry.row = row;
                if entry.state != EntityState::Added {
                    entry.state = EntityState::Modified;
                }
                return key;
            }
        }
        self.attach(set, identity, row, EntityState::Modified)
    }

    /// Marks an entity for deletion.
    ///
    /// An unresolved identity is attached first and then marked `Deleted`;
    /// a resolved one is marked in place without a second attach. Removing a
    /// pending `Added` entry detaches it instead - a row that never reached
    /// the store has nothing to delete.
    pub fn remove(&mut self, set: &'static str, identity: Option<EntityKey>, row: Row) -> EntityKey {
        if let Some(key) = identity {
            if let Some(pos) = self
                .entries
                .iter()
                .position(|e| !e.synthetic && e.set == set && e.key == key)
            {
                if self.entries[pos].state == EntityState::Added {
                    self.entries.remove(pos);
                } else {
                    self.entries[pos].state = EntityState::Deleted;
                }
                return key;
            }
        }
        self.attach(set, identity, row, EntityState::Deleted)
    }

    /// Attaches an entity as `Unchanged` to prime in-place edits.
    ///
    /// A no-op when the identity is already tracked.
    pub fn track(&mut self, set: &'static str, identity: Option<EntityKey>, row: Row) -> EntityKey {
        if let Some(key) = identity {
            if self.resolve(set, key).is_some() {
                return key;
            }
        }
        self.attach(set, identity, row, EntityState::Unchanged)
    }

    /// Collects the pending row mutations, in tracking order.
    #[must_use]
    pub fn pending(&self) -> Vec<RowChange> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.state {
                EntityState::Unchanged => None,
                EntityState::Added => Some(RowChange::insert(
                    entry.set,
                    entry.key.as_uuid(),
                    entry.row.clone(),
                )),
                EntityState::Modified => Some(RowChange::update(
                    entry.set,
                    entry.key.as_uuid(),
                    entry.row.clone(),
                )),
                EntityState::Deleted => {
                    Some(RowChange::delete(entry.set, entry.key.as_uuid()))
                }
            })
            .collect()
    }

    /// Settles entries after a successful save: deleted entries are dropped,
    /// everything else becomes `Unchanged`.
    pub fn mark_saved(&mut self) {
        self.entries.retain(|e| e.state != EntityState::Deleted);
        for entry in &mut self.entries {
            entry.state = EntityState::Unchanged;
        }
    }

    /// Drops every tracked entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SET: &str = "things";

    fn key() -> EntityKey {
        EntityKey::new()
    }

    #[test]
    fn add_attaches_new_identity_once() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.add(SET, Some(k), json!({"v": 1}));

        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_tracked(SET, Some(k)));
        assert_eq!(tracker.resolve(SET, k).unwrap().state(), EntityState::Added);
    }

    #[test]
    fn re_add_overwrites_values_without_second_entry() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.remove(SET, Some(k), json!({"v": 1}));
        tracker.add(SET, Some(k), json!({"v": 2}));

        assert_eq!(tracker.len(), 1);
        let entry = tracker.resolve(SET, k).unwrap();
        assert_eq!(entry.state(), EntityState::Added);
        assert_eq!(entry.row(), &json!({"v": 2}));
    }

    #[test]
    fn update_copies_values_onto_tracked_entry() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.track(SET, Some(k), json!({"v": 1}));
        tracker.update(SET, Some(k), json!({"v": 2}));
        // Repeating the update is a state no-op.
        tracker.update(SET, Some(k), json!({"v": 2}));

        assert_eq!(tracker.len(), 1);
        let entry = tracker.resolve(SET, k).unwrap();
        assert_eq!(entry.state(), EntityState::Modified);
        assert_eq!(entry.row(), &json!({"v": 2}));
    }

    #[test]
    fn remove_untracked_attaches_then_marks_deleted() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        assert!(!tracker.is_tracked(SET, Some(k)));

        tracker.remove(SET, Some(k), json!({"v": 1}));
        assert!(tracker.is_tracked(SET, Some(k)));
        assert_eq!(
            tracker.resolve(SET, k).unwrap().state(),
            EntityState::Deleted
        );
    }

    #[test]
    fn update_of_a_pending_add_stays_an_insert() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.add(SET, Some(k), json!({"v": 1}));
        tracker.update(SET, Some(k), json!({"v": 2}));

        assert_eq!(tracker.len(), 1);
        let entry = tracker.resolve(SET, k).unwrap();
        assert_eq!(entry.state(), EntityState::Added);
        assert_eq!(entry.row(), &json!({"v": 2}));

        let pending = tracker.pending();
        assert_eq!(pending.len(), 1);
        assert!(matches!(&pending[0], RowChange::Insert { .. }));
    }

    #[test]
    fn remove_of_a_pending_add_detaches_it() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.add(SET, Some(k), json!({"v": 1}));
        tracker.remove(SET, Some(k), json!({"v": 1}));

        assert!(tracker.is_empty());
        assert!(tracker.pending().is_empty());
    }

    #[test]
    fn remove_tracked_marks_in_place() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.track(SET, Some(k), json!({"v": 1}));
        assert_eq!(tracker.len(), 1);

        tracker.remove(SET, Some(k), json!({"v": 1}));
        assert_eq!(tracker.len(), 1);
        assert_eq!(
            tracker.resolve(SET, k).unwrap().state(),
            EntityState::Deleted
        );
    }

    #[test]
    fn identity_less_entities_never_reconcile() {
        let mut tracker = ChangeTracker::new();
        tracker.add(SET, None, json!({"v": 1}));
        tracker.add(SET, None, json!({"v": 1}));

        assert_eq!(tracker.len(), 2);
        assert!(!tracker.is_tracked(SET, None));
    }

    #[test]
    fn identity_is_scoped_per_set() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.track("a", Some(k), json!({}));
        assert!(!tracker.is_tracked("b", Some(k)));
    }

    #[test]
    fn track_is_a_no_op_on_tracked_identity() {
        let mut tracker = ChangeTracker::new();
        let k = key();
        tracker.update(SET, Some(k), json!({"v": 2}));
        tracker.track(SET, Some(k), json!({"v": 1}));

        assert_eq!(tracker.len(), 1);
        let entry = tracker.resolve(SET, k).unwrap();
        assert_eq!(entry.state(), EntityState::Modified);
        assert_eq!(entry.row(), &json!({"v": 2}));
    }

    #[test]
    fn pending_maps_states_to_row_changes() {
        let mut tracker = ChangeTracker::new();
        let (a, b, c, d) = (key(), key(), key(), key());
        tracker.track(SET, Some(a), json!({}));
        tracker.add(SET, Some(b), json!({"v": 1}));
        tracker.update(SET, Some(c), json!({"v": 2}));
        tracker.remove(SET, Some(d), json!({}));

        let pending = tracker.pending();
        assert_eq!(pending.len(), 3);
        assert!(matches!(&pending[0], RowChange::Insert { key, .. } if *key == b.as_uuid()));
        assert!(matches!(&pending[1], RowChange::Update { key, .. } if *key == c.as_uuid()));
        assert!(matches!(&pending[2], RowChange::Delete { key, .. } if *key == d.as_uuid()));
    }

    #[test]
    fn mark_saved_settles_states() {
        let mut tracker = ChangeTracker::new();
        let (a, b) = (key(), key());
        tracker.add(SET, Some(a), json!({"v": 1}));
        tracker.remove(SET, Some(b), json!({}));

        tracker.mark_saved();
        assert_eq!(tracker.len(), 1);
        assert_eq!(
            tracker.resolve(SET, a).unwrap().state(),
            EntityState::Unchanged
        );
        assert!(tracker.pending().is_empty());
    }
}
