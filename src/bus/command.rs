use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::oneshot;

use super::coordinator::BusStats;
use crate::broadcast::BroadcastMessage;
use crate::event::Event;
use crate::handler::HandlerRef;
use crate::log::EventQuery;
use crate::registry::Subscribed;

/// Mailbox messages processed one at a time by the coordinator.
pub(crate) enum Command {
    /// Fire-and-forget publish.
    Publish(Arc<Event>),
    /// Append and broadcast; reply with the handlers to run.
    PublishSync {
        event: Arc<Event>,
        reply: oneshot::Sender<Vec<HandlerRef>>,
    },
    PublishBatch(Vec<Arc<Event>>),
    /// Message received from another node.
    Remote(BroadcastMessage),
    Subscribe {
        event_type: String,
        handler: HandlerRef,
        reply: oneshot::Sender<Subscribed>,
    },
    Unsubscribe {
        event_type: String,
        handler_id: String,
        reply: oneshot::Sender<bool>,
    },
    Subscriptions {
        reply: oneshot::Sender<BTreeMap<String, Vec<String>>>,
    },
    EventsByAggregate {
        aggregate_type: String,
        aggregate_id: String,
        query: EventQuery,
        reply: oneshot::Sender<Vec<Event>>,
    },
    EventsByType {
        event_type: String,
        query: EventQuery,
        reply: oneshot::Sender<Vec<Event>>,
    },
    Stats {
        reply: oneshot::Sender<BusStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
