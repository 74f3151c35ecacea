//! Failure-path tests using the fault-injecting backend.

use quarry_core::{CoreError, StoreContext};
use quarry_store::StoreError;
use quarry_testkit::prelude::*;
use std::sync::Arc;

fn faulty_repository() -> (Arc<FaultBackend>, quarry_core::Repository<Employee>) {
    let backend = Arc::new(FaultBackend::new());
    let repo = employee_repository(Arc::new(StoreContext::new(backend.clone())));
    (backend, repo)
}

#[tokio::test]
async fn failed_save_keeps_changes_pending_for_retry() {
    init_tracing();
    let (backend, repo) = faulty_repository();

    repo.add(&employee("ada", 36)).unwrap();
    backend.fail_next_apply(StoreError::connection("socket reset"));

    let err = repo.save_changes().await.unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::Connection { .. })));
    // Nothing was settled, so the retry carries the same change.
    assert_eq!(repo.context().tracked_count(), 1);
    assert_eq!(repo.save_changes().await.unwrap(), 1);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_begin_leaves_no_ambient_transaction() {
    let (backend, repo) = faulty_repository();
    backend.fail_next_begin(StoreError::connection("socket reset"));

    let id = uuid::Uuid::new_v4();
    assert!(repo.begin_transaction(id).await.is_err());
    assert!(repo.transaction().is_none());

    // A later begin under the same id succeeds.
    repo.begin_transaction(id).await.unwrap();
    repo.rollback(id).await.unwrap();
}

#[tokio::test]
async fn store_duplicate_key_surfaces_as_identity_conflict() {
    let (backend, repo) = faulty_repository();

    let ada = employee("ada", 36);
    backend.fail_next_apply(StoreError::duplicate_key(
        "employees",
        ada.id.as_uuid(),
    ));
    repo.add(&ada).unwrap();

    let err = repo.save_changes().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::IdentityConflict { set, key }
            if set == "employees" && key == ada.id.as_uuid()
    ));
}
