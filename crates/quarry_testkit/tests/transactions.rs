//! Ambient-transaction integration tests across repositories.

use quarry_core::{CoreError, Repository};
use quarry_testkit::prelude::*;
use uuid::Uuid;

#[tokio::test]
async fn transaction_spans_every_repository_on_the_context() {
    let ctx = memory_context();
    let employees = employee_repository(ctx.clone());
    let notes = Repository::<AuditNote>::new(ctx);

    let id = Uuid::new_v4();
    employees.begin_transaction(id).await.unwrap();
    // The other repository observes the same ambient transaction.
    assert_eq!(notes.transaction().unwrap().id, id);

    employees.add(&employee("ada", 36)).unwrap();
    notes
        .add(&AuditNote {
            message: "ada hired".to_owned(),
            at: 1,
        })
        .unwrap();
    employees.save_changes().await.unwrap();

    // Commit through the repository that did not begin it.
    notes.commit(id).await.unwrap();
    assert!(employees.transaction().is_none());
    assert_eq!(employees.count().await.unwrap(), 1);
    assert_eq!(notes.count().await.unwrap(), 1);
}

#[tokio::test]
async fn rollback_discards_saves_made_inside_the_transaction() {
    let ctx = memory_context();
    let employees = employee_repository(ctx);

    let id = Uuid::new_v4();
    employees.begin_transaction(id).await.unwrap();
    employees.add(&employee("ada", 36)).unwrap();
    employees.save_changes().await.unwrap();
    assert_eq!(employees.count().await.unwrap(), 1);

    employees.rollback(id).await.unwrap();
    assert_eq!(employees.count().await.unwrap(), 0);
    assert!(employees.transaction().is_none());
}

#[tokio::test]
async fn nested_begin_is_rejected() {
    let repo = employee_repository(memory_context());
    let first = Uuid::new_v4();

    repo.begin_transaction(first).await.unwrap();
    let err = repo.begin_transaction(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::TransactionAlreadyOpen { id } if id == first));
}

#[tokio::test]
async fn completion_requires_the_opening_id() {
    let repo = employee_repository(memory_context());
    let id = Uuid::new_v4();
    repo.begin_transaction(id).await.unwrap();

    let wrong = Uuid::new_v4();
    let err = repo.commit(wrong).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::TransactionIdMismatch { expected, actual }
            if expected == id && actual == wrong
    ));

    // The transaction survives the failed completion.
    assert!(repo.transaction().is_some());
    repo.commit(id).await.unwrap();
}

#[tokio::test]
async fn completing_without_an_open_transaction_fails() {
    let repo = employee_repository(memory_context());

    let err = repo.commit(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::NoActiveTransaction));
    let err = repo.rollback(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::NoActiveTransaction));
}
