//! Change-tracking integration tests: reconciliation, identity, conflicts.

use quarry_core::{CoreError, Repository, StoreContext};
use quarry_store::MemoryBackend;
use quarry_testkit::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn add_then_update_persists_as_one_row() {
    let repo = employee_repository(memory_context());

    let mut ada = employee("ada", 36);
    repo.add(&ada).unwrap();
    ada.age = 37;
    repo.update(&ada).unwrap();

    assert_eq!(repo.save_changes().await.unwrap(), 1);
    assert_eq!(repo.count().await.unwrap(), 1);
    let saved = repo.get(|e| e.name == "ada", &[]).await.unwrap().unwrap();
    assert_eq!(saved.age, 37);
}

#[tokio::test]
async fn remove_of_a_pending_add_cancels_it() {
    let repo = employee_repository(memory_context());

    let ada = employee("ada", 36);
    repo.add(&ada).unwrap();
    assert!(repo.is_tracked(&ada).unwrap());
    repo.remove(&ada).unwrap();
    assert!(!repo.is_tracked(&ada).unwrap());

    assert_eq!(repo.save_changes().await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn remove_all_deletes_the_batch() {
    let roster = vec![employee("ada", 36), employee("bob", 41), employee("cyd", 20)];
    let repo = seeded_employees(&roster).await;

    repo.remove_all(&roster[..2]).unwrap();
    assert_eq!(repo.save_changes().await.unwrap(), 2);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn tracked_read_edit_update_save_roundtrip() {
    let repo = seeded_employees(&[employee("ada", 36)]).await;

    let mut ada = repo
        .get_tracked(|e| e.name == "ada", &[])
        .await
        .unwrap()
        .unwrap();
    assert!(repo.is_tracked(&ada).unwrap());

    ada.status = "inactive".to_owned();
    repo.update(&ada).unwrap();
    assert_eq!(repo.save_changes().await.unwrap(), 1);

    let reread = repo.get(|e| e.name == "ada", &[]).await.unwrap().unwrap();
    assert_eq!(reread.status, "inactive");
}

#[tokio::test]
async fn untracked_reads_never_touch_the_tracker() {
    let repo = seeded_employees(&[employee("ada", 36)]).await;
    assert_eq!(repo.context().tracked_count(), 0);

    let ada = repo.get(|e| e.name == "ada", &[]).await.unwrap().unwrap();
    assert!(!repo.is_tracked(&ada).unwrap());
    assert_eq!(repo.context().tracked_count(), 0);

    repo.list_tracked(|_| true, &[]).await.unwrap();
    assert_eq!(repo.context().tracked_count(), 1);
}

#[tokio::test]
async fn entities_without_identity_always_insert_fresh_rows() {
    let repo = Repository::<AuditNote>::new(memory_context());
    let note = AuditNote {
        message: "first login".to_owned(),
        at: 1_700_000_000,
    };

    repo.add(&note).unwrap();
    repo.add(&note).unwrap();
    assert!(!repo.is_tracked(&note).unwrap());

    assert_eq!(repo.save_changes().await.unwrap(), 2);
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn duplicate_insert_across_contexts_is_an_identity_conflict() {
    let backend = Arc::new(MemoryBackend::new());
    let first = employee_repository(Arc::new(StoreContext::new(backend.clone())));
    let second = employee_repository(Arc::new(StoreContext::new(backend)));

    let ada = employee("ada", 36);
    first.add(&ada).unwrap();
    first.save_changes().await.unwrap();

    second.add(&ada).unwrap();
    let err = second.save_changes().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::IdentityConflict { set, key }
            if set == "employees" && key == ada.id.as_uuid()
    ));
}

#[tokio::test]
async fn disposed_context_rejects_reads_and_writes() {
    let repo = seeded_employees(&[employee("ada", 36)]).await;
    repo.dispose();

    assert!(matches!(
        repo.count().await,
        Err(CoreError::ContextDisposed)
    ));
    assert!(matches!(
        repo.add(&employee("bob", 41)),
        Err(CoreError::ContextDisposed)
    ));
    // Disposal dropped the tracked state.
    assert_eq!(repo.context().tracked_count(), 0);
}
