//! Field values and per-entity-type accessor maps.
//!
//! Textual filters and sort specs refer to fields by name. Each entity type
//! publishes a table of `(name, accessor fn)` pairs once; the query compiler
//! resolves names against that table at compile time, so row evaluation is a
//! plain fn-pointer call with no per-row lookup.

use crate::entity::{Entity, EntityKey};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// A scalar field value extracted from an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String. Dates and keys compare in their canonical string form
    /// (ISO-8601 dates order correctly this way).
    Str(String),
}

impl FieldValue {
    /// Compares two values for ordering.
    ///
    /// Integers and floats compare numerically across kinds. Strings compare
    /// lexicographically. `Null` and mismatched kinds have no ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Compares two values for equality, with numeric coercion.
    ///
    /// Unlike [`FieldValue::compare`], `Null` equals `Null` here.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<EntityKey> for FieldValue {
    fn from(v: EntityKey) -> Self {
        Self::Str(v.to_string())
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A named field accessor for entity type `T`.
pub struct FieldSpec<T: ?Sized> {
    /// Field name as it appears in filter and sort expressions.
    pub name: &'static str,
    /// Accessor extracting the field's value from an entity.
    pub get: fn(&T) -> FieldValue,
}

impl<T: ?Sized> FieldSpec<T> {
    /// Creates a field spec.
    #[must_use]
    pub const fn new(name: &'static str, get: fn(&T) -> FieldValue) -> Self {
        Self { name, get }
    }
}

impl<T: ?Sized> Clone for FieldSpec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for FieldSpec<T> {}

impl<T: ?Sized> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The resolved accessor map for entity type `T`.
///
/// Built once per repository from [`Entity::fields`]; lookups happen at
/// expression compile time only.
pub struct FieldMap<T> {
    by_name: HashMap<&'static str, fn(&T) -> FieldValue>,
}

impl<T: Entity> FieldMap<T> {
    /// Builds the map from the entity's published field table.
    #[must_use]
    pub fn of() -> Self {
        Self {
            by_name: T::fields().iter().map(|spec| (spec.name, spec.get)).collect(),
        }
    }

    /// Resolves a field name to its accessor.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<fn(&T) -> FieldValue> {
        self.by_name.get(name).copied()
    }

    /// Returns true if the entity type published no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl<T> fmt::Debug for FieldMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMap")
            .field("fields", &self.by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_coerces() {
        assert_eq!(
            FieldValue::Int(2).compare(&FieldValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert!(FieldValue::Int(3).equals(&FieldValue::Float(3.0)));
    }

    #[test]
    fn strings_compare_lexicographically() {
        assert_eq!(
            FieldValue::from("2024-01-01").compare(&FieldValue::from("2024-02-01")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn mismatched_kinds_have_no_order() {
        assert_eq!(FieldValue::from("a").compare(&FieldValue::Int(1)), None);
        assert!(!FieldValue::from("a").equals(&FieldValue::Int(1)));
    }

    #[test]
    fn null_equals_only_null() {
        assert!(FieldValue::Null.equals(&FieldValue::Null));
        assert!(!FieldValue::Null.equals(&FieldValue::Int(0)));
        assert_eq!(FieldValue::Null.compare(&FieldValue::Null), None);
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(7i64)), FieldValue::Int(7));
    }
}
