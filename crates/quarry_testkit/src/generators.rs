//! Property-based test generators using proptest.

use crate::fixtures::{employee, punch, Employee, Punch};
use proptest::prelude::*;

/// Strategy producing an employee with a fresh identity.
pub fn employee_strategy() -> impl Strategy<Value = Employee> {
    ("[a-z]{3,12}", 0i64..100, prop_oneof!["active", "inactive", "onboarding"]).prop_map(
        |(name, age, status)| {
            let mut e = employee(&name, age);
            e.status = status;
            e
        },
    )
}

/// Strategy producing up to `max` employees.
pub fn employees_strategy(max: usize) -> impl Strategy<Value = Vec<Employee>> {
    prop::collection::vec(employee_strategy(), 0..=max)
}

/// Strategy producing one employee plus up to `max` of their punches.
pub fn employee_with_punches_strategy(max: usize) -> impl Strategy<Value = (Employee, Vec<Punch>)> {
    (employee_strategy(), prop::collection::vec(0i64..1_000_000, 0..=max)).prop_map(
        |(owner, instants)| {
            let punches = instants.into_iter().map(|at| punch(&owner, at)).collect();
            (owner, punches)
        },
    )
}

/// Strategy producing a valid 1-based page request.
pub fn window_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..6, 1u64..8)
}
