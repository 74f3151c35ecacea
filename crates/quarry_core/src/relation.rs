//! Related-entity includes and split-query merging.

use crate::entity::Entity;
use crate::error::CoreResult;
use quarry_store::Row;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A named relation from entity type `T` to a related set.
///
/// Relations back the include paths of read operations. Each included
/// relation is fetched as its own separate query (split-query mode) and its
/// rows are merged onto the primaries by identity, so including several
/// one-to-many relations never multiplies the primary rows.
///
/// The `foreign_key` names the field of the related row holding the
/// primary's identity value; `attach` hands the grouped rows to the entity,
/// which decodes them into its own collection field.
pub struct Relation<T: Entity> {
    path: &'static str,
    set: &'static str,
    foreign_key: &'static str,
    attach: fn(&mut T, Vec<Row>) -> CoreResult<()>,
}

impl<T: Entity> Relation<T> {
    /// Creates a relation.
    #[must_use]
    pub fn new(
        path: &'static str,
        set: &'static str,
        foreign_key: &'static str,
        attach: fn(&mut T, Vec<Row>) -> CoreResult<()>,
    ) -> Self {
        Self {
            path,
            set,
            foreign_key,
            attach,
        }
    }

    /// The include path this relation answers to.
    #[must_use]
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The related set fetched by this relation's split query.
    #[must_use]
    pub fn set(&self) -> &'static str {
        self.set
    }

    /// Merges the related rows onto the primaries by identity.
    ///
    /// Every identity-bearing primary receives its group (possibly empty, so
    /// collection fields land empty rather than stale). Identity-less
    /// primaries cannot be merged against and are skipped.
    pub(crate) fn merge(&self, primaries: &mut [T], related: Vec<(Uuid, Row)>) -> CoreResult<()> {
        let mut groups: HashMap<Uuid, Vec<Row>> = HashMap::new();
        for (_, row) in related {
            let fk = row
                .get(self.foreign_key)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok());
            if let Some(fk) = fk {
                groups.entry(fk).or_default().push(row);
            }
        }

        for primary in primaries.iter_mut() {
            if let Some(key) = primary.identity() {
                let rows = groups.remove(&key.as_uuid()).unwrap_or_default();
                (self.attach)(primary, rows)?;
            }
        }
        Ok(())
    }
}

impl<T: Entity> fmt::Debug for Relation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("path", &self.path)
            .field("set", &self.set)
            .field("foreign_key", &self.foreign_key)
            .finish_non_exhaustive()
    }
}
