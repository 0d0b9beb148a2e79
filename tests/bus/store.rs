//! Log queries, eviction, and replay.

use std::time::Duration;

use domain_bus::{Event, EventQuery, PublishOptions, DEFAULT_LOG_CAPACITY};
use serde_json::{json, Value};

use crate::support::bus;

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    status: String,
    items: Vec<String>,
}

fn apply(mut order: Order, event: &Event) -> Order {
    match event.event_type() {
        "order_created" => order.status = "open".into(),
        "item_added" => {
            if let Some(sku) = event.payload()["sku"].as_str() {
                order.items.push(sku.to_string());
            }
        }
        "order_shipped" => order.status = "shipped".into(),
        _ => {}
    }
    order
}

fn order_history() -> Vec<(&'static str, Value)> {
    vec![
        ("order_created", json!({"customer": "c-1"})),
        ("item_added", json!({"sku": "apple"})),
        ("item_added", json!({"sku": "pear"})),
        ("order_shipped", json!({})),
    ]
}

#[tokio::test]
async fn oldest_events_are_evicted_at_capacity() {
    let (bus, _) = bus();

    let mut first = None;
    for n in 0..=DEFAULT_LOG_CAPACITY {
        let id = bus
            .publish("tick", json!({ "n": n }), PublishOptions::new())
            .unwrap();
        first.get_or_insert(id);
    }

    let stats = bus.stats().await.unwrap();
    assert_eq!(stats.logged, DEFAULT_LOG_CAPACITY);
    assert_eq!(stats.evicted, 1);

    let kept = bus
        .get_events_by_type("tick", EventQuery::unbounded())
        .await
        .unwrap();
    assert_eq!(kept.len(), DEFAULT_LOG_CAPACITY);
    let first = first.unwrap();
    assert!(kept.iter().all(|e| e.id() != first));
    assert_eq!(kept[0].payload()["n"], json!(DEFAULT_LOG_CAPACITY));
}

#[tokio::test]
async fn replay_matches_a_direct_fold() {
    let (bus, _) = bus();
    let options = || PublishOptions::new().aggregate("order", "42");

    let mut local = Vec::new();
    for (event_type, payload) in order_history() {
        bus.publish(event_type, payload.clone(), options()).unwrap();
        local.push(Event::build(event_type, payload, options()).unwrap());
    }
    // Noise on another aggregate.
    bus.publish(
        "item_added",
        json!({"sku": "plum"}),
        PublishOptions::new().aggregate("order", "43"),
    )
    .unwrap();

    let replayed: Order = bus.replay("order", "42", apply).await.unwrap();
    let direct = local.iter().fold(Order::default(), apply);

    assert_eq!(replayed, direct);
    assert_eq!(
        replayed,
        Order {
            status: "shipped".into(),
            items: vec!["apple".into(), "pear".into()],
        }
    );
}

#[tokio::test]
async fn replay_from_starts_at_the_given_state() {
    let (bus, _) = bus();
    bus.publish(
        "item_added",
        json!({"sku": "fig"}),
        PublishOptions::new().aggregate("order", "7"),
    )
    .unwrap();

    let seed = Order {
        status: "imported".into(),
        items: vec!["legacy".into()],
    };
    let state = bus.replay_from("order", "7", seed, apply).await.unwrap();

    assert_eq!(state.status, "imported");
    assert_eq!(state.items, vec!["legacy".to_string(), "fig".to_string()]);
}

#[tokio::test]
async fn replay_of_unknown_aggregate_is_initial_state() {
    let (bus, _) = bus();
    let count = bus
        .replay("order", "missing", |n: usize, _event| n + 1)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn replay_leaves_the_log_untouched() {
    let (bus, _) = bus();
    for (event_type, payload) in order_history() {
        bus.publish(
            event_type,
            payload,
            PublishOptions::new().aggregate("order", "42"),
        )
        .unwrap();
    }

    let before = bus
        .get_events("order", "42", EventQuery::new())
        .await
        .unwrap();
    bus.replay("order", "42", apply).await.unwrap();
    let after = bus
        .get_events("order", "42", EventQuery::new())
        .await
        .unwrap();

    assert_eq!(before, after);
    assert_eq!(bus.stats().await.unwrap().logged, 4);
}

#[tokio::test]
async fn since_is_strictly_after() {
    let (bus, _) = bus();
    let aggregate = || PublishOptions::new().aggregate("ticket", "t-1");

    bus.publish("ticket_opened", json!({}), aggregate()).unwrap();
    let opened = bus
        .get_events("ticket", "t-1", EventQuery::new())
        .await
        .unwrap();
    let cutoff = opened[0].occurred_at();

    tokio::time::sleep(Duration::from_millis(5)).await;
    bus.publish("ticket_closed", json!({}), aggregate()).unwrap();

    let later = bus
        .get_events("ticket", "t-1", EventQuery::new().since(cutoff))
        .await
        .unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].event_type(), "ticket_closed");
}

#[tokio::test]
async fn queries_default_to_one_hundred_newest() {
    let (bus, _) = bus();
    for n in 0..150 {
        bus.publish(
            "reading",
            json!({ "n": n }),
            PublishOptions::new().aggregate("sensor", "s-1"),
        )
        .unwrap();
    }

    let by_type = bus
        .get_events_by_type("reading", EventQuery::new())
        .await
        .unwrap();
    assert_eq!(by_type.len(), 100);
    assert_eq!(by_type[0].payload()["n"], json!(149));
    assert_eq!(by_type[99].payload()["n"], json!(50));

    let by_aggregate = bus
        .get_events("sensor", "s-1", EventQuery::new().limit(3))
        .await
        .unwrap();
    let ns: Vec<&Value> = by_aggregate.iter().map(|e| &e.payload()["n"]).collect();
    assert_eq!(ns, vec![&json!(149), &json!(148), &json!(147)]);
}
