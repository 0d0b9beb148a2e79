//! Subscription management and wildcard routing.

use std::sync::Arc;

use domain_bus::{BusError, Handler, HandlerRef, PublishOptions, Subscribed, WILDCARD};
use serde_json::json;

use crate::support::{bus, eventually, settle, Recorder};

#[tokio::test]
async fn subscribing_twice_is_idempotent() {
    let (bus, _) = bus();
    let recorder = Recorder::new("projector");

    assert_eq!(
        bus.subscribe("order_created", recorder.clone()).await.unwrap(),
        Subscribed::Added
    );
    assert_eq!(
        bus.subscribe("order_created", recorder.clone()).await.unwrap(),
        Subscribed::AlreadySubscribed
    );

    let subs = bus.subscriptions().await.unwrap();
    assert_eq!(subs["order_created"], vec!["projector".to_string()]);

    bus.publish("order_created", json!({}), PublishOptions::new())
        .unwrap();
    assert!(eventually(|| recorder.count() == 1).await);
    settle().await;
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn closures_and_objects_share_the_registry() {
    let (bus, _) = bus();
    let object: Arc<dyn Handler> = Arc::new(Recorder::new("object"));
    let closure = HandlerRef::from_fn("closure", |_event| async { Ok(()) });

    bus.subscribe("t", object).await.unwrap();
    bus.subscribe("t", closure).await.unwrap();

    let subs = bus.subscriptions().await.unwrap();
    assert_eq!(
        subs["t"],
        vec!["closure".to_string(), "object".to_string()]
    );
}

#[tokio::test]
async fn subscribe_all_reports_each_type() {
    let (bus, _) = bus();
    let recorder = Recorder::new("multi");
    bus.subscribe("b", recorder.clone()).await.unwrap();

    let results = bus
        .subscribe_all(["a", "b", "c"], recorder.clone())
        .await
        .unwrap();

    assert_eq!(
        results,
        vec![
            ("a".to_string(), Subscribed::Added),
            ("b".to_string(), Subscribed::AlreadySubscribed),
            ("c".to_string(), Subscribed::Added),
        ]
    );
    assert_eq!(bus.subscriptions().await.unwrap().len(), 3);
    assert_eq!(bus.stats().await.unwrap().subscriptions, 3);
}

#[tokio::test]
async fn unsubscribe_stops_delivery_and_tolerates_absence() {
    let (bus, _) = bus();
    let recorder = Recorder::new("temp");
    bus.subscribe("t", recorder.clone()).await.unwrap();

    assert!(bus.unsubscribe("t", "temp").await.unwrap());
    assert!(!bus.unsubscribe("t", "temp").await.unwrap());
    assert!(!bus.unsubscribe("never", "nobody").await.unwrap());
    assert!(bus.subscriptions().await.unwrap().is_empty());

    bus.publish("t", json!({}), PublishOptions::new()).unwrap();
    settle().await;
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn wildcard_receives_every_type() {
    let (bus, _) = bus();
    let everything = Recorder::new("everything");
    let orders = Recorder::new("orders");
    bus.subscribe(WILDCARD, everything.clone()).await.unwrap();
    bus.subscribe("order_created", orders.clone()).await.unwrap();

    for event_type in ["order_created", "user_registered", "message_sent"] {
        bus.publish(event_type, json!({}), PublishOptions::new())
            .unwrap();
    }

    assert!(eventually(|| everything.count() == 3).await);
    settle().await;
    let mut seen = everything.types();
    seen.sort_unstable();
    assert_eq!(
        seen,
        vec!["message_sent", "order_created", "user_registered"]
    );
    assert_eq!(orders.types(), vec!["order_created"]);
}

#[tokio::test]
async fn handler_on_type_and_wildcard_runs_once() {
    let (bus, _) = bus();
    let recorder = Recorder::new("both");
    bus.subscribe(WILDCARD, recorder.clone()).await.unwrap();
    bus.subscribe("t", recorder.clone()).await.unwrap();

    let outcomes = bus
        .publish_sync("t", json!({}), PublishOptions::new())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn shutdown_closes_every_handle() {
    let (bus, _) = bus();
    let other = bus.clone();

    bus.shutdown().await.unwrap();

    assert!(matches!(other.stats().await, Err(BusError::Closed)));
    assert!(eventually(|| other.is_closed()).await);
    assert!(matches!(
        other.publish("t", json!({}), PublishOptions::new()),
        Err(BusError::Closed)
    ));
    assert!(matches!(
        other.subscribe("t", Recorder::new("late")).await,
        Err(BusError::Closed)
    ));
}
