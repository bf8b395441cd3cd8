//! Integration tests for the vendor provisioning saga: every failure path
//! must leave no orphaned identity or user record behind.

mod common;

use accounts::models::user::UserRole;
use accounts::models::vendor_application::ApplicationStatus;
use accounts::provisioning::{ProvisionRequest, ProvisioningSaga};
use accounts::repositories::UserRepository;

use common::{business, harness};

fn request(email: &str) -> ProvisionRequest {
    ProvisionRequest {
        email: email.to_string(),
        password: "hunter2hunter2".to_string(),
        display_name: "Vendor".to_string(),
        phone: Some("+15550100".to_string()),
        categories: vec!["food".to_string(), "store".to_string()],
        business: business("owner@tidalgoods.test"),
    }
}

#[tokio::test]
async fn successful_saga_creates_all_three_records() {
    let h = harness().await;
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    let outcome = saga.execute(request("vendor@example.test")).await.unwrap();

    assert!(h.identity.contains(outcome.identity_id));
    assert_eq!(outcome.user.role, UserRole::Registered);
    assert_eq!(outcome.application.status, ApplicationStatus::Pending);
    assert_eq!(outcome.application.identity_id, outcome.identity_id);

    // The applicant got a "received" notification.
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.kind(), "application_received");
}

#[tokio::test]
async fn empty_categories_create_no_identity() {
    let h = harness().await;
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    let mut bad = request("vendor@example.test");
    bad.categories.clear();

    let err = saga.execute(bad).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_CATEGORIES");
    assert_eq!(h.identity.identity_count(), 0);
}

#[tokio::test]
async fn submission_failure_compensates_identity_and_user() {
    let h = harness().await;
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    let mut bad = request("vendor@example.test");
    bad.business.contact_email = "not-an-email".to_string();

    let err = saga.execute(bad).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_EMAIL");

    // No orphaned identity upstream, no orphaned user row locally.
    assert_eq!(h.identity.identity_count(), 0);
    let users = UserRepository::new(&h.state.db);
    assert!(
        users
            .find_by_identity(uuid::Uuid::new_v4())
            .await
            .unwrap()
            .is_none()
    );
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn link_failure_compensates_identity() {
    let h = harness().await;
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    saga.execute(request("first@example.test")).await.unwrap();
    assert_eq!(h.identity.identity_count(), 1);

    // Same provider email is rejected at step one; nothing new to unwind.
    let err = saga.execute(request("first@example.test")).await.unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_IDENTITY");
    assert_eq!(h.identity.identity_count(), 1);
}

#[tokio::test]
async fn provider_outage_surfaces_as_unavailable() {
    let h = harness().await;
    h.identity.fail_next_create();
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    let err = saga.execute(request("vendor@example.test")).await.unwrap_err();
    assert_eq!(err.code(), "PROVIDER_UNAVAILABLE");
    assert_eq!(h.identity.identity_count(), 0);
}

#[tokio::test]
async fn saga_retry_after_outage_succeeds() {
    let h = harness().await;
    h.identity.fail_next_create();
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    assert!(saga.execute(request("vendor@example.test")).await.is_err());

    let outcome = saga.execute(request("vendor@example.test")).await.unwrap();
    assert!(h.identity.contains(outcome.identity_id));
}

#[tokio::test]
async fn compensation_failure_never_masks_original_error() {
    let h = harness().await;
    h.identity.set_fail_deletes(true);
    let saga = ProvisioningSaga::new(
        h.state.db.clone(),
        h.identity.clone(),
        h.state.notifier.clone(),
    );

    let mut bad = request("vendor@example.test");
    bad.business.contact_email = "not-an-email".to_string();

    let err = saga.execute(bad).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_EMAIL");

    // The identity delete failed, so the orphan remains upstream; the sweep
    // of the identity store is an operator concern, not a saga error.
    assert_eq!(h.identity.identity_count(), 1);
}
