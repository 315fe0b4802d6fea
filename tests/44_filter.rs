mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::Method;

use common::{MockBackend, TestClient, USER_EMAIL};
use rapido_client::config::QueryConfig;
use rapido_client::filter::RideFilter;
use rapido_client::rides::{AutoConfirm, MutationOutcome, RideListView, RideScope, RideStatus};

fn fast_config() -> QueryConfig {
    QueryConfig {
        debounce_ms: 150,
        ..QueryConfig::default()
    }
}

fn open_view(client: &TestClient) -> Result<RideListView> {
    Ok(RideListView::open(
        client.session.gateway().clone(),
        RideScope::Own,
        RideFilter::default(),
        &fast_config(),
        Arc::new(client.notifier.clone()),
        Arc::new(AutoConfirm),
    )?)
}

#[tokio::test]
async fn rapid_status_edits_trigger_one_refetch() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    backend.set_rides(vec![
        common::ride_json("r1", "pending"),
        common::ride_json("r2", "approved"),
        common::ride_json("r3", "cancelled"),
    ]);
    let client = TestClient::signed_in(&backend, USER_EMAIL).await?;
    let view = open_view(&client)?;

    // Initial snapshot is fetched without waiting for the debounce
    let list = view.list().clone();
    assert!(common::eventually(Duration::from_secs(2), || list.applied_snapshot().is_some()).await);
    assert_eq!(view.rides().len(), 3);

    for status in [
        RideStatus::Pending,
        RideStatus::Approved,
        RideStatus::Rejected,
        RideStatus::Cancelled,
        RideStatus::Approved,
    ] {
        view.pipeline().set_status(Some(status))?;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    let fetches = backend.calls_to(Method::GET, "/rides");
    assert_eq!(fetches.len(), 2, "{:?}", fetches);
    let last = &fetches[1];
    assert_eq!(last.query.get("status").map(String::as_str), Some("approved"));
    assert_eq!(last.query.get("page").map(String::as_str), Some("1"));

    let rides = view.rides();
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0].id, "r2");
    Ok(())
}

#[tokio::test]
async fn slower_stale_response_does_not_overwrite_newer_one() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    backend.set_rides(vec![
        common::ride_json("r1", "pending"),
        common::ride_json("r2", "approved"),
    ]);
    backend.set_slow_status("pending", Duration::from_millis(500));
    let client = TestClient::signed_in(&backend, USER_EMAIL).await?;
    let view = open_view(&client)?;
    let list = view.list().clone();
    assert!(common::eventually(Duration::from_secs(2), || list.applied_snapshot().is_some()).await);

    view.pipeline().set_status(Some(RideStatus::Pending))?;
    // Let the pending snapshot go out, then supersede it
    assert!(
        common::eventually(Duration::from_secs(2), || {
            backend.calls_to(Method::GET, "/rides").len() == 2
        })
        .await
    );
    view.pipeline().set_status(Some(RideStatus::Approved))?;

    tokio::time::sleep(Duration::from_millis(900)).await;

    let applied = list.applied_snapshot().expect("applied snapshot");
    assert_eq!(applied.filter().status, Some(RideStatus::Approved));
    let ids: Vec<String> = view.rides().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["r2".to_string()]);
    Ok(())
}

#[tokio::test]
async fn page_change_keeps_filter() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    let client = TestClient::signed_in(&backend, USER_EMAIL).await?;
    let view = open_view(&client)?;

    view.pipeline().set_department(Some("Finance".to_string()))?;
    view.pipeline().set_page(2)?;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let fetches = backend.calls_to(Method::GET, "/rides");
    let last = fetches.last().expect("at least one fetch");
    assert_eq!(last.query.get("department").map(String::as_str), Some("Finance"));
    assert_eq!(last.query.get("page").map(String::as_str), Some("2"));
    Ok(())
}

#[tokio::test]
async fn polling_refetches_current_snapshot() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    let client = TestClient::signed_in(&backend, USER_EMAIL).await?;
    let mut view = open_view(&client)?;
    view.start_polling(Duration::from_millis(100));

    assert!(
        common::eventually(Duration::from_secs(2), || {
            backend.calls_to(Method::GET, "/rides").len() >= 3
        })
        .await
    );

    // Dropping the view stops the poller
    drop(view);
    tokio::time::sleep(Duration::from_millis(150)).await;
    let settled = backend.calls_to(Method::GET, "/rides").len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.calls_to(Method::GET, "/rides").len(), settled);
    Ok(())
}

#[tokio::test]
async fn polling_leaves_in_flight_ride_busy() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    backend.set_rides(vec![common::ride_json("r1", "approved")]);
    backend.set_mutation_delay(Duration::from_millis(400));
    let client = TestClient::signed_in(&backend, USER_EMAIL).await?;

    let mut view = open_view(&client)?;
    assert!(common::eventually(Duration::from_secs(2), || !view.rides().is_empty()).await);
    view.start_polling(Duration::from_millis(40));

    let cancel = tokio::spawn({
        let controller = view.controller().clone();
        async move { controller.cancel("r1").await }
    });
    assert!(common::eventually(Duration::from_secs(2), || view.controller().is_busy("r1")).await);

    let polls_before = backend.calls_to(Method::GET, "/rides").len();
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(view.controller().is_busy("r1"));
    }
    // Refreshes landed while the cancel was still on the wire
    assert!(backend.calls_to(Method::GET, "/rides").len() >= polls_before + 2);

    assert_eq!(cancel.await??, MutationOutcome::Completed);
    assert!(!view.controller().is_busy("r1"));
    assert!(
        common::eventually(Duration::from_secs(2), || view.list().status_of("r1") == Some(RideStatus::Cancelled)).await
    );
    Ok(())
}
