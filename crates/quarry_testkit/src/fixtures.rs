//! Test fixtures and context helpers.
//!
//! Provides a small domain model (employees and their punches, plus an
//! identity-less audit note) and convenience functions for seeding a
//! repository over an in-memory backend.

use quarry_core::{
    CoreResult, Entity, EntityKey, FieldSpec, FieldValue, Relation, Repository, StoreContext,
};
use quarry_store::{MemoryBackend, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An identity-bearing aggregate with a one-to-many relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Primary identity.
    pub id: EntityKey,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i64,
    /// Lifecycle status, e.g. `"active"`.
    pub status: String,
    /// Navigation collection, populated only through includes.
    #[serde(default, skip_serializing)]
    pub punches: Vec<Punch>,
}

impl Entity for Employee {
    const SET: &'static str = "employees";

    fn identity(&self) -> Option<EntityKey> {
        Some(self.id)
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        const FIELDS: &[FieldSpec<Employee>] = &[
            FieldSpec::new("id", |e| FieldValue::from(e.id)),
            FieldSpec::new("name", |e| FieldValue::Str(e.name.clone())),
            FieldSpec::new("age", |e| FieldValue::Int(e.age)),
            FieldSpec::new("status", |e| FieldValue::Str(e.status.clone())),
        ];
        FIELDS
    }
}

/// A clock punch belonging to one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Punch {
    /// Primary identity.
    pub id: EntityKey,
    /// Identity of the owning employee.
    pub employee_id: EntityKey,
    /// Punch instant as a unix timestamp.
    pub clocked_at: i64,
}

impl Entity for Punch {
    const SET: &'static str = "punches";

    fn identity(&self) -> Option<EntityKey> {
        Some(self.id)
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        const FIELDS: &[FieldSpec<Punch>] = &[
            FieldSpec::new("employee_id", |p| FieldValue::from(p.employee_id)),
            FieldSpec::new("clocked_at", |p| FieldValue::Int(p.clocked_at)),
        ];
        FIELDS
    }
}

/// An entity without identity: every write is a fresh insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditNote {
    /// Free-form note text.
    pub message: String,
    /// Note instant as a unix timestamp.
    pub at: i64,
}

impl Entity for AuditNote {
    const SET: &'static str = "audit_notes";
}

/// Creates an active employee with a fresh identity.
pub fn employee(name: &str, age: i64) -> Employee {
    Employee {
        id: EntityKey::new(),
        name: name.to_owned(),
        age,
        status: "active".to_owned(),
        punches: Vec::new(),
    }
}

/// Creates a punch owned by `owner`.
pub fn punch(owner: &Employee, clocked_at: i64) -> Punch {
    Punch {
        id: EntityKey::new(),
        employee_id: owner.id,
        clocked_at,
    }
}

/// The `punches` include relation of [`Employee`].
pub fn punches_relation() -> Relation<Employee> {
    fn attach(employee: &mut Employee, rows: Vec<Row>) -> CoreResult<()> {
        employee.punches = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        Ok(())
    }
    Relation::new("punches", Punch::SET, "employee_id", attach)
}

/// Creates a fresh context over an in-memory backend.
pub fn memory_context() -> Arc<StoreContext> {
    Arc::new(StoreContext::new(Arc::new(MemoryBackend::new())))
}

/// Creates an employee repository with the `punches` relation registered.
pub fn employee_repository(ctx: Arc<StoreContext>) -> Repository<Employee> {
    Repository::new(ctx).with_relation(punches_relation())
}

/// Seeds the given employees and returns a repository over the same backend.
///
/// Seeding goes through a throwaway context, so the returned repository
/// starts with an empty tracker - a successful save leaves its entries
/// tracked as unchanged, and tests should not inherit that state from setup.
pub async fn seeded_employees(employees: &[Employee]) -> Repository<Employee> {
    let backend = Arc::new(MemoryBackend::new());
    let seeder = employee_repository(Arc::new(StoreContext::new(backend.clone())));
    for employee in employees {
        seeder.add(employee).expect("failed to stage employee");
    }
    seeder
        .save_changes()
        .await
        .expect("failed to seed employees");
    employee_repository(Arc::new(StoreContext::new(backend)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeding_persists_every_employee() {
        let repo = seeded_employees(&[employee("ada", 36), employee("bob", 17)]).await;
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn seeding_leaves_the_tracker_empty() {
        let ada = employee("ada", 36);
        let repo = seeded_employees(&[ada.clone()]).await;

        assert_eq!(repo.context().tracked_count(), 0);
        assert!(!repo.is_tracked(&ada).unwrap());
    }

    #[test]
    fn employee_row_omits_the_navigation_collection() {
        let mut ada = employee("ada", 36);
        ada.punches.push(punch(&ada, 1));
        let row = serde_json::to_value(&ada).unwrap();
        assert!(row.get("punches").is_none());
    }
}
