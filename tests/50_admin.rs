mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::Method;

use common::{MockBackend, TestClient, ADMIN_EMAIL, USER_EMAIL};
use rapido_client::admin::{AdminApi, UserQuery};
use rapido_client::error::ErrorKind;
use rapido_client::guard::{self, GuardDecision};
use rapido_client::rides::{AutoConfirm, MutationOutcome, RideController, RideList, RideScope, RideStatus, RidesApi};

#[tokio::test]
async fn admin_approves_pending_ride() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    backend.set_rides(vec![common::ride_json("r1", "pending")]);
    let client = TestClient::signed_in(&backend, ADMIN_EMAIL).await?;

    let gateway = client.session.gateway().clone();
    let list = RideList::new(gateway.clone(), RideScope::All);
    list.upsert(RidesApi::new(gateway.clone()).get("r1").await?);
    let controller = RideController::new(gateway, list, Arc::new(client.notifier.clone()), Arc::new(AutoConfirm));

    let outcome = controller.approve("r1", Some("Client visit")).await?;
    assert_eq!(outcome, MutationOutcome::Completed);

    let calls = backend.calls_to(Method::PUT, "/admin/rides/r1/approve");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body.as_ref().and_then(|b| b["comments"].as_str()), Some("Client visit"));
    assert_eq!(controller.list().status_of("r1"), Some(RideStatus::Approved));
    assert_eq!(client.notifier.entries().last().map(|n| n.message.clone()), Some("Ride approved".to_string()));

    // A decided ride is refused locally
    let before = backend.calls().len();
    let err = controller.reject("r1", Some("Duplicate"), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(backend.calls().len(), before);
    Ok(())
}

#[tokio::test]
async fn user_hitting_admin_endpoint_is_forbidden_once() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    let client = TestClient::signed_in(&backend, USER_EMAIL).await?;

    let err = AdminApi::new(client.session.gateway().clone())
        .analytics(None, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(client.notifier.errors(), vec!["Admin access required".to_string()]);
    // Forbidden is not a session problem
    assert!(client.session.is_authenticated());
    assert!(client.navigator.history().is_empty());

    // The guard would not have let the user there in the first place
    let session = client.session.snapshot();
    assert_eq!(guard::check(&session, "/admin"), GuardDecision::Redirect("/dashboard"));
    Ok(())
}

#[tokio::test]
async fn analytics_activity_and_users_decode() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    let client = TestClient::signed_in(&backend, ADMIN_EMAIL).await?;
    let api = AdminApi::new(client.session.gateway().clone());

    let analytics = api.analytics(None, None).await?;
    assert_eq!(analytics.summary.total_rides, 4);
    assert_eq!(analytics.summary.approval_rate(), 50);
    assert_eq!(analytics.monthly_analytics[0].label(), "2026-10");

    let activity = api.recent_activity(2).await?;
    assert_eq!(activity.len(), 2);
    assert_eq!(activity[0].destination(), Some("Airport"));
    let calls = backend.calls_to(Method::GET, "/admin/recent-activity");
    assert_eq!(calls[0].query.get("limit").map(String::as_str), Some("2"));

    let users = api.users(&UserQuery::default()).await?;
    assert_eq!(users.users.len(), 2);
    assert_eq!(users.pagination.map(|p| p.total), Some(2));

    api.delete_user("u-user").await?;
    assert_eq!(backend.calls_to(Method::DELETE, "/users/u-user").len(), 1);
    assert!(client.notifier.errors().is_empty());
    Ok(())
}
