//! Handler failures stay with the handler.

use domain_bus::telemetry::{HANDLED, HANDLER_ERROR};
use domain_bus::{HandlerError, PublishOptions, TelemetrySignal};
use serde_json::json;

use crate::support::{bus, eventually, Failing, Panicking, PanicsOnCall, Recorder};

#[tokio::test]
async fn failing_handler_does_not_block_siblings() {
    let (bus, telemetry) = bus();
    let healthy = Recorder::new("healthy");
    bus.subscribe("order_created", Failing("broken")).await.unwrap();
    bus.subscribe("order_created", healthy.clone()).await.unwrap();

    let id = bus
        .publish("order_created", json!({}), PublishOptions::new())
        .unwrap();

    assert!(eventually(|| healthy.count() == 1).await);
    assert!(eventually(|| telemetry.named(HANDLER_ERROR).len() == 1).await);

    let errors = telemetry.named(HANDLER_ERROR);
    assert!(matches!(
        &errors[0],
        TelemetrySignal::HandlerError { handler, event_id, event_type, error }
            if handler == "broken"
                && event_id == &id
                && event_type == "order_created"
                && error == "handler failed: refused"
    ));
}

#[tokio::test]
async fn panicking_handler_does_not_crash_the_bus() {
    let (bus, _) = bus();
    let healthy = Recorder::new("healthy");
    bus.subscribe("t", Panicking).await.unwrap();
    bus.subscribe("t", healthy.clone()).await.unwrap();

    let outcomes = bus
        .publish_sync("t", json!({}), PublishOptions::new())
        .await
        .unwrap();

    let panicked = outcomes.iter().find(|o| o.handler == "panicking").unwrap();
    assert!(
        matches!(&panicked.result, Err(HandlerError::Panicked(msg)) if msg == "handler exploded")
    );
    assert_eq!(healthy.count(), 1);

    // Subsequent publishes still succeed.
    bus.publish("t", json!({}), PublishOptions::new()).unwrap();
    assert!(eventually(|| healthy.count() == 2).await);
    assert!(!bus.is_closed());
}

#[tokio::test]
async fn every_invocation_reports_duration() {
    let (bus, telemetry) = bus();
    bus.subscribe("t", Recorder::new("a")).await.unwrap();
    bus.subscribe("t", Failing("b")).await.unwrap();

    bus.publish_sync("t", json!({}), PublishOptions::new())
        .await
        .unwrap();

    let handled = telemetry.named(HANDLED);
    assert_eq!(handled.len(), 2);
    for signal in handled {
        match signal {
            TelemetrySignal::Handled { duration_ms, .. } => assert!(duration_ms >= 0.0),
            other => panic!("unexpected signal {:?}", other),
        }
    }
}

#[tokio::test]
async fn handler_panicking_before_its_future_is_isolated() {
    let (bus, telemetry) = bus();
    let healthy = Recorder::new("healthy");
    bus.subscribe("t", PanicsOnCall).await.unwrap();
    bus.subscribe("t", healthy.clone()).await.unwrap();

    // Fire-and-forget: reported, sibling unaffected.
    let id = bus.publish("t", json!({}), PublishOptions::new()).unwrap();
    assert!(eventually(|| telemetry.named(HANDLER_ERROR).len() == 1).await);
    assert!(eventually(|| healthy.count() == 1).await);
    assert!(matches!(
        &telemetry.named(HANDLER_ERROR)[0],
        TelemetrySignal::HandlerError { handler, event_id, error, .. }
            if handler == "panics_on_call"
                && event_id == &id
                && error == "handler panicked: rejected before the future"
    ));

    // Synchronous: a panic outcome, not a lost task.
    let outcomes = bus
        .publish_sync("t", json!({}), PublishOptions::new())
        .await
        .unwrap();
    let failed = outcomes
        .iter()
        .find(|o| o.handler == "panics_on_call")
        .unwrap();
    assert!(matches!(failed.result, Err(HandlerError::Panicked(_))));
    assert_eq!(telemetry.named(HANDLER_ERROR).len(), 2);
    assert_eq!(healthy.count(), 2);
}
