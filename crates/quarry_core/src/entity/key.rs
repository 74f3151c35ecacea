//! Entity identity value.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The identity value of an entity.
///
/// Keys are opaque and comparable; equality is all the layer ever needs.
/// Freshly minted keys are random v4 UUIDs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityKey(Uuid);

impl EntityKey {
    /// Mints a fresh random key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for EntityKey {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keys_are_distinct() {
        assert_ne!(EntityKey::new(), EntityKey::new());
    }

    #[test]
    fn round_trips_through_uuid() {
        let id = Uuid::new_v4();
        let key = EntityKey::from_uuid(id);
        assert_eq!(key.as_uuid(), id);
    }

    #[test]
    fn serializes_as_plain_uuid() {
        let key = EntityKey::new();
        let json = serde_json::to_value(key).unwrap();
        assert_eq!(json, serde_json::json!(key.as_uuid().to_string()));
    }
}
