//! Fire-and-forget publish.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use domain_bus::telemetry::PUBLISHED;
use domain_bus::{BusConfig, BusError, EventQuery, HandlerRef, PublishOptions, TelemetrySignal};
use serde_json::json;

use crate::support::{bus, bus_with, eventually, settle, Recorder};

// ============================================================================
// Ids
// ============================================================================

#[tokio::test]
async fn ten_thousand_publishes_yield_distinct_ids() {
    let (bus, _) = bus();

    let mut ids = HashSet::new();
    for n in 0..10_000 {
        let id = bus
            .publish("tick", json!({ "n": n }), PublishOptions::new())
            .unwrap();
        assert!(id.starts_with("evt_"));
        assert!(ids.insert(id));
    }
    assert_eq!(ids.len(), 10_000);
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn subscribed_handler_sees_the_event_once() {
    let (bus, _) = bus();
    let recorder = Recorder::new("recorder");
    bus.subscribe("message_sent", recorder.clone()).await.unwrap();

    let id = bus
        .publish("message_sent", json!({"body": "hi"}), PublishOptions::new())
        .unwrap();

    assert!(eventually(|| recorder.count() == 1).await);
    settle().await;
    let seen = recorder.events();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id(), id);
    assert_eq!(seen[0].payload(), &json!({"body": "hi"}));
}

#[tokio::test]
async fn publish_does_not_wait_for_slow_handlers() {
    let (bus, _) = bus();
    let slow = HandlerRef::from_fn("slow", |_event| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(())
    });
    bus.subscribe("report_requested", slow).await.unwrap();

    let started = Instant::now();
    for _ in 0..10 {
        bus.publish("report_requested", json!({}), PublishOptions::new())
            .unwrap();
    }
    assert!(started.elapsed() < Duration::from_millis(300));

    // The coordinator keeps serving while handlers sleep.
    let logged = bus
        .get_events_by_type("report_requested", EventQuery::new())
        .await
        .unwrap();
    assert_eq!(logged.len(), 10);
}

#[tokio::test]
async fn handlers_for_other_types_are_not_called() {
    let (bus, _) = bus();
    let recorder = Recorder::new("orders_only");
    bus.subscribe("order_created", recorder.clone()).await.unwrap();

    bus.publish("user_registered", json!({}), PublishOptions::new())
        .unwrap();
    bus.publish("order_created", json!({}), PublishOptions::new())
        .unwrap();

    assert!(eventually(|| recorder.count() == 1).await);
    settle().await;
    assert_eq!(recorder.types(), vec!["order_created"]);
}

// ============================================================================
// Validation and provenance
// ============================================================================

#[tokio::test]
async fn empty_type_fails_before_anything_is_logged() {
    let (bus, telemetry) = bus();

    let err = bus.publish("", json!({}), PublishOptions::new()).unwrap_err();
    assert!(matches!(err, BusError::InvalidEvent(_)));

    let stats = bus.stats().await.unwrap();
    assert_eq!(stats.logged, 0);
    assert_eq!(stats.published, 0);
    assert!(telemetry.signals().is_empty());
}

#[tokio::test]
async fn events_carry_node_source_and_options() {
    let (bus, _) = bus();

    bus.publish(
        "message_sent",
        json!({}),
        PublishOptions::new()
            .aggregate("conversation", "c-9")
            .user("u-1")
            .correlation("corr_req_1"),
    )
    .unwrap();

    let events = bus
        .get_events("conversation", "c-9", EventQuery::new())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    let meta = events[0].metadata();
    assert_eq!(meta.source, "test-node");
    assert_eq!(meta.user_id.as_deref(), Some("u-1"));
    assert_eq!(meta.correlation_id, "corr_req_1");
    assert_eq!(events[0].version(), 1);
}

#[tokio::test]
async fn publish_emits_published_signal() {
    let (bus, telemetry) = bus();

    let id = bus
        .publish(
            "order_created",
            json!({}),
            PublishOptions::new().aggregate("order", "1"),
        )
        .unwrap();
    bus.stats().await.unwrap();

    assert_eq!(
        telemetry.named(PUBLISHED),
        vec![TelemetrySignal::Published {
            event_type: "order_created".into(),
            aggregate_type: Some("order".into()),
            event_id: id,
        }]
    );
}

// ============================================================================
// Backpressure
// ============================================================================

#[tokio::test(flavor = "current_thread")]
async fn full_mailbox_rejects_instead_of_growing() {
    let (bus, _) = bus_with(
        BusConfig::new()
            .with_node_id("test-node")
            .with_mailbox_capacity(2),
    );

    // The coordinator cannot run until this task yields.
    bus.publish("burst", json!({}), PublishOptions::new()).unwrap();
    bus.publish("burst", json!({}), PublishOptions::new()).unwrap();
    let err = bus
        .publish("burst", json!({}), PublishOptions::new())
        .unwrap_err();
    assert!(matches!(err, BusError::Overloaded(2)));
    assert!(matches!(
        bus.publish_batch(vec![("burst", json!({}), PublishOptions::new())]),
        Err(BusError::Overloaded(2))
    ));

    // Once drained, publishing works again and only accepted events are logged.
    let stats = bus.stats().await.unwrap();
    assert_eq!(stats.logged, 2);
    bus.publish("burst", json!({}), PublishOptions::new()).unwrap();
    assert_eq!(bus.stats().await.unwrap().logged, 3);
}
