//! Entity trait and identity types.

mod fields;
mod key;

pub use fields::{FieldMap, FieldSpec, FieldValue};
pub use key::EntityKey;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A persistable domain record.
///
/// Entities are plain serde types backed by one named set in the store. The
/// two capability methods are optional and defaulted:
///
/// - [`Entity::identity`] - entities that carry a comparable identity value
///   override this; entities that leave the default `None` are always
///   treated as new on write and never reconcile against tracked state.
/// - [`Entity::fields`] - entities queried or sorted through the textual
///   expression language publish their field-accessor table here; the table
///   is consulted once at expression compile time.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Employee {
///     id: EntityKey,
///     name: String,
///     age: i64,
/// }
///
/// impl Entity for Employee {
///     const SET: &'static str = "employees";
///
///     fn identity(&self) -> Option<EntityKey> {
///         Some(self.id)
///     }
///
///     fn fields() -> &'static [FieldSpec<Self>] {
///         const FIELDS: &[FieldSpec<Employee>] = &[
///             FieldSpec::new("id", |e| FieldValue::from(e.id)),
///             FieldSpec::new("name", |e| FieldValue::from(e.name.clone())),
///             FieldSpec::new("age", |e| FieldValue::from(e.age)),
///         ];
///         FIELDS
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the backing set (table) in the store.
    const SET: &'static str;

    /// The entity's identity value, if this type carries one.
    fn identity(&self) -> Option<EntityKey> {
        None
    }

    /// The field-accessor table for textual filters and sorting.
    ///
    /// Referencing an unpublished field in an expression is a parse error.
    fn fields() -> &'static [FieldSpec<Self>]
    where
        Self: Sized,
    {
        &[]
    }
}
