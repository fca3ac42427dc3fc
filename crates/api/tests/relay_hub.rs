//! Tests for `RelayHub` and `NotificationRelay`.
//!
//! These exercise the per-user relay directly, without HTTP upgrades:
//! attach/detach bookkeeping, per-user delivery, reaping idle actors and
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use chrono::Utc;
use nvoi_api::relay::{start_heartbeat, NotificationRelay, RelayHub};
use nvoi_core::types::DbId;
use nvoi_db::models::job::Job;
use nvoi_events::{EventBus, JobUpdate};
use serde_json::json;

fn frame(message: Message) -> serde_json::Value {
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

fn job_for(user_id: DbId, status: &str) -> Job {
    Job {
        id: DbId::now_v7(),
        user_id,
        job_type: "export".to_string(),
        key: format!("{user_id}:k"),
        status: status.to_string(),
        payload: Some(json!({})),
        result: None,
        error: None,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
    }
}

// ---------------------------------------------------------------------------
// Test: attaching starts one actor per user
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attach_starts_one_runner_per_user() {
    let hub = RelayHub::new();
    let alice = DbId::new_v4();
    let bob = DbId::new_v4();

    let _a1 = hub.attach(alice, "a1".into()).await;
    let _a2 = hub.attach(alice, "a2".into()).await;
    let _b1 = hub.attach(bob, "b1".into()).await;

    assert_eq!(hub.runner_count().await, 2);
    assert_eq!(hub.connection_count().await, 3);
}

// ---------------------------------------------------------------------------
// Test: detach with unknown ids is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detach_unknown_ids_is_noop() {
    let hub = RelayHub::new();
    let alice = DbId::new_v4();
    let _rx = hub.attach(alice, "a1".into()).await;

    hub.detach(alice, "nonexistent").await;
    hub.detach(DbId::new_v4(), "a1").await;

    assert_eq!(hub.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: notify only reaches the addressed user
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_reaches_only_the_owner() {
    let hub = RelayHub::new();
    let alice = DbId::new_v4();
    let bob = DbId::new_v4();
    let mut alice_rx = hub.attach(alice, "a1".into()).await;
    let mut bob_rx = hub.attach(bob, "b1".into()).await;

    assert!(hub.notify(alice, "alice:k", &json!({ "status": "queued" }), 42).await);

    let update = frame(alice_rx.recv().await.unwrap());
    assert_eq!(update, json!({ "key": "alice:k", "data": { "status": "queued" }, "timestamp": 42 }));

    // Bob's actor has nothing queued for him.
    assert_eq!(hub.connection_count().await, 2);
    assert!(bob_rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: notify without an actor reports nobody listening
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_without_runner_returns_false() {
    let hub = RelayHub::new();

    assert!(!hub.notify(DbId::new_v4(), "k", &json!({}), 0).await);
}

// ---------------------------------------------------------------------------
// Test: reap_idle stops actors without sockets and keeps the rest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reap_idle_removes_empty_runners() {
    let hub = RelayHub::new();
    let alice = DbId::new_v4();
    let bob = DbId::new_v4();
    let _alice_rx = hub.attach(alice, "a1".into()).await;
    let _bob_rx = hub.attach(bob, "b1".into()).await;

    hub.detach(bob, "b1").await;
    assert_eq!(hub.reap_idle().await, 1);
    assert_eq!(hub.runner_count().await, 1);

    // Bob reconnecting gets a fresh actor.
    let mut bob_rx = hub.attach(bob, "b2".into()).await;
    assert!(hub.notify(bob, "bob:k", &json!({}), 1).await);
    assert_eq!(frame(bob_rx.recv().await.unwrap())["key"], "bob:k");
}

// ---------------------------------------------------------------------------
// Test: ping_all sends Ping frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_all_sends_ping_frames() {
    let hub = RelayHub::new();
    let mut rx = hub.attach(DbId::new_v4(), "a1".into()).await;

    hub.ping_all().await;

    assert!(matches!(rx.recv().await, Some(Message::Ping(_))));
}

// ---------------------------------------------------------------------------
// Test: the heartbeat task pings live sockets and reaps idle runners
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_then_reaps() {
    let hub = Arc::new(RelayHub::new());
    let alice = DbId::new_v4();
    let bob = DbId::new_v4();
    let mut alice_rx = hub.attach(alice, "a1".into()).await;
    let _bob_rx = hub.attach(bob, "b1".into()).await;
    hub.detach(bob, "b1").await;

    let heartbeat = start_heartbeat(Arc::clone(&hub));

    // The paused clock jumps straight to the first 30s tick.
    assert!(matches!(alice_rx.recv().await, Some(Message::Ping(_))));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(hub.runner_count().await, 1);
    assert_eq!(hub.connection_count().await, 1);

    heartbeat.abort();
}

// ---------------------------------------------------------------------------
// Test: shutdown_all closes every socket and empties the hub
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_frames() {
    let hub = RelayHub::new();
    let mut rx1 = hub.attach(DbId::new_v4(), "a1".into()).await;
    let mut rx2 = hub.attach(DbId::new_v4(), "b1".into()).await;

    hub.shutdown_all().await;

    assert!(matches!(rx1.recv().await, Some(Message::Close(None))));
    assert!(matches!(rx2.recv().await, Some(Message::Close(None))));
    assert_eq!(hub.runner_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: NotificationRelay forwards bus updates as full job rows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notification_relay_forwards_job_updates() {
    let bus = EventBus::default();
    let hub = Arc::new(RelayHub::new());
    let relay = tokio::spawn(NotificationRelay::new(Arc::clone(&hub)).run(bus.subscribe()));

    let user_id = DbId::new_v4();
    let mut rx = hub.attach(user_id, "c1".into()).await;

    for status in ["queued", "started", "completed"] {
        bus.publish(JobUpdate::from_job(job_for(user_id, status)));
    }
    // Nobody is attached for this one; it is dropped.
    bus.publish(JobUpdate::from_job(job_for(DbId::new_v4(), "queued")));

    let mut seen = Vec::new();
    for _ in 0..3 {
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let update = frame(message);
        assert_eq!(update["key"], format!("{user_id}:k"));
        assert_eq!(update["data"]["userId"], user_id.to_string());
        assert_eq!(update["data"]["type"], "export");
        seen.push(update["data"]["status"].as_str().unwrap().to_string());
    }
    assert_eq!(seen, ["queued", "started", "completed"]);

    drop(bus);
    tokio::time::timeout(Duration::from_secs(2), relay)
        .await
        .expect("relay should stop once the bus is gone")
        .unwrap();
}
