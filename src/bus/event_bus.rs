//! Cloneable handle to a running coordinator.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use super::command::Command;
use super::coordinator::{BusStats, Coordinator};
use crate::broadcast::{Broadcaster, Standalone};
use crate::config::BusConfig;
use crate::dispatch::Dispatcher;
use crate::error::BusError;
use crate::event::{Event, PublishOptions};
use crate::handler::{HandlerOutcome, HandlerRef};
use crate::log::EventQuery;
use crate::registry::Subscribed;
use crate::telemetry::{Telemetry, TracingTelemetry};

/// Builder for [`EventBus`].
pub struct EventBusBuilder {
    config: BusConfig,
    telemetry: Arc<dyn Telemetry>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self {
            config: BusConfig::default(),
            telemetry: Arc::new(TracingTelemetry),
            broadcaster: Arc::new(Standalone),
        }
    }
}

impl EventBusBuilder {
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Sink for `events.*` telemetry signals (default: `tracing`).
    pub fn telemetry<T: Telemetry>(mut self, telemetry: T) -> Self {
        self.telemetry = Arc::new(telemetry);
        self
    }

    /// Transport reaching other nodes (default: [`Standalone`]).
    pub fn broadcaster<B: Broadcaster>(mut self, broadcaster: B) -> Self {
        self.broadcaster = Arc::new(broadcaster);
        self
    }

    /// Spawn the coordinator on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn start(self) -> EventBus {
        let config = Arc::new(self.config);
        let dispatcher = Dispatcher::new(self.telemetry);
        let inbox =
            Coordinator::new(Arc::clone(&config), dispatcher.clone(), self.broadcaster).spawn();
        EventBus {
            inbox,
            dispatcher,
            config,
        }
    }
}

/// Handle to the domain event bus.
///
/// Cheap to clone; every clone talks to the same coordinator. The
/// coordinator stops after [`shutdown`](Self::shutdown) or when the last
/// handle is dropped.
///
/// ## Example
///
/// ```
/// use domain_bus::{EventBus, HandlerRef, PublishOptions};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), domain_bus::BusError> {
/// let bus = EventBus::start_default();
///
/// bus.subscribe("message_sent", HandlerRef::from_fn("notifier", |event| async move {
///     tracing::info!(event_id = event.id(), "notify");
///     Ok(())
/// }))
/// .await?;
///
/// let outcomes = bus
///     .publish_sync("message_sent", json!({"body": "hi"}), PublishOptions::new())
///     .await?;
/// assert_eq!(outcomes.len(), 1);
/// assert!(outcomes[0].is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    inbox: mpsc::Sender<Command>,
    dispatcher: Dispatcher,
    config: Arc<BusConfig>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Start a standalone bus with `config` and `tracing` telemetry.
    pub fn start(config: BusConfig) -> Self {
        Self::builder().config(config).start()
    }

    /// Start a standalone bus with default configuration.
    pub fn start_default() -> Self {
        Self::builder().start()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// Build an event stamped with this node as default source.
    fn build(
        &self,
        event_type: impl Into<String>,
        payload: Value,
        options: PublishOptions,
    ) -> Result<Event, BusError> {
        Event::build(event_type, payload, options.or_source(&self.config.node_id))
    }

    /// Queue without waiting; a full mailbox is an error.
    fn send(&self, command: Command) -> Result<(), BusError> {
        self.inbox.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => BusError::Overloaded(self.config.mailbox_capacity),
            TrySendError::Closed(_) => BusError::Closed,
        })
    }

    /// Queue (waiting for mailbox room) and await the coordinator's reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, BusError> {
        let (reply, rx) = oneshot::channel();
        self.inbox
            .send(command(reply))
            .await
            .map_err(|_| BusError::Closed)?;
        rx.await.map_err(|_| BusError::Closed)
    }

    /// Publish without waiting for handlers. Returns the new event id.
    ///
    /// Never blocks: the event is queued for the coordinator, which logs it,
    /// spawns one task per handler, and broadcasts it to other nodes. Fails
    /// with [`BusError::Overloaded`] when the mailbox is full.
    pub fn publish(
        &self,
        event_type: impl Into<String>,
        payload: Value,
        options: PublishOptions,
    ) -> Result<String, BusError> {
        let event = self.build(event_type, payload, options)?;
        let id = event.id().to_string();
        self.send(Command::Publish(Arc::new(event)))?;
        Ok(id)
    }

    /// Publish and wait for every handler, bounded by the configured
    /// `sync_timeout`.
    pub async fn publish_sync(
        &self,
        event_type: impl Into<String>,
        payload: Value,
        options: PublishOptions,
    ) -> Result<Vec<HandlerOutcome>, BusError> {
        self.publish_sync_with_timeout(event_type, payload, options, self.config.sync_timeout)
            .await
    }

    /// Publish and wait for every handler, at most `timeout`.
    ///
    /// On timeout the caller gets [`BusError::SyncTimeout`]. The event stays
    /// logged and broadcast, and handlers already running keep running.
    pub async fn publish_sync_with_timeout(
        &self,
        event_type: impl Into<String>,
        payload: Value,
        options: PublishOptions,
        timeout: Duration,
    ) -> Result<Vec<HandlerOutcome>, BusError> {
        let event = Arc::new(self.build(event_type, payload, options)?);

        let wait = async {
            let handlers = self
                .request(|reply| Command::PublishSync {
                    event: Arc::clone(&event),
                    reply,
                })
                .await?;
            Ok::<_, BusError>(self.dispatcher.run_all(handlers, Arc::clone(&event)).await)
        };

        // `Timeout` polls `wait` before its deadline, so a reply that has
        // arrived always reaches `run_all` and the handlers get spawned.
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    event_id = event.id(),
                    event_type = event.event_type(),
                    timeout_ms = timeout.as_millis() as u64,
                    "synchronous publish timed out"
                );
                Err(BusError::SyncTimeout(timeout))
            }
        }
    }

    /// Publish several events at once. Returns their ids in input order.
    ///
    /// Every event is built before anything is queued, so an invalid entry
    /// rejects the whole batch. The batch is logged as one extension,
    /// dispatched per event, and broadcast as a single message.
    pub fn publish_batch<I, T>(&self, entries: I) -> Result<Vec<String>, BusError>
    where
        I: IntoIterator<Item = (T, Value, PublishOptions)>,
        T: Into<String>,
    {
        let events = entries
            .into_iter()
            .map(|(event_type, payload, options)| {
                self.build(event_type, payload, options).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ids = events.iter().map(|e| e.id().to_string()).collect();
        if !events.is_empty() {
            self.send(Command::PublishBatch(events))?;
        }
        Ok(ids)
    }

    /// Subscribe `handler` to `event_type` (`"*"` for every type).
    pub async fn subscribe(
        &self,
        event_type: impl Into<String>,
        handler: impl Into<HandlerRef>,
    ) -> Result<Subscribed, BusError> {
        let event_type = event_type.into();
        let handler = handler.into();
        self.request(|reply| Command::Subscribe {
            event_type,
            handler,
            reply,
        })
        .await
    }

    /// Subscribe `handler` to each type independently.
    pub async fn subscribe_all<I, T>(
        &self,
        event_types: I,
        handler: impl Into<HandlerRef>,
    ) -> Result<Vec<(String, Subscribed)>, BusError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let handler = handler.into();
        let mut results = Vec::new();
        for event_type in event_types {
            let event_type = event_type.into();
            let outcome = self.subscribe(event_type.clone(), handler.clone()).await?;
            results.push((event_type, outcome));
        }
        Ok(results)
    }

    /// Remove the handler named `handler_id` from `event_type`.
    ///
    /// Returns whether it was subscribed; absence is not an error.
    pub async fn unsubscribe(
        &self,
        event_type: impl Into<String>,
        handler_id: impl Into<String>,
    ) -> Result<bool, BusError> {
        let event_type = event_type.into();
        let handler_id = handler_id.into();
        self.request(|reply| Command::Unsubscribe {
            event_type,
            handler_id,
            reply,
        })
        .await
    }

    /// Snapshot of the registry: event type -> handler ids, newest first.
    pub async fn subscriptions(&self) -> Result<BTreeMap<String, Vec<String>>, BusError> {
        self.request(|reply| Command::Subscriptions { reply }).await
    }

    /// Logged events of one aggregate, newest-first.
    pub async fn get_events(
        &self,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        query: EventQuery,
    ) -> Result<Vec<Event>, BusError> {
        let aggregate_type = aggregate_type.into();
        let aggregate_id = aggregate_id.into();
        self.request(|reply| Command::EventsByAggregate {
            aggregate_type,
            aggregate_id,
            query,
            reply,
        })
        .await
    }

    /// Logged events of one type, newest-first.
    pub async fn get_events_by_type(
        &self,
        event_type: impl Into<String>,
        query: EventQuery,
    ) -> Result<Vec<Event>, BusError> {
        let event_type = event_type.into();
        self.request(|reply| Command::EventsByType {
            event_type,
            query,
            reply,
        })
        .await
    }

    /// Rebuild aggregate state by folding its logged events, oldest first,
    /// starting from `S::default()`.
    ///
    /// Read-only: the log is not modified.
    pub async fn replay<S, F>(
        &self,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        reducer: F,
    ) -> Result<S, BusError>
    where
        S: Default,
        F: FnMut(S, &Event) -> S,
    {
        self.replay_from(aggregate_type, aggregate_id, S::default(), reducer)
            .await
    }

    /// Like [`replay`](Self::replay) with an explicit initial state.
    pub async fn replay_from<S, F>(
        &self,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        initial: S,
        reducer: F,
    ) -> Result<S, BusError>
    where
        F: FnMut(S, &Event) -> S,
    {
        let history = self
            .get_events(aggregate_type, aggregate_id, EventQuery::unbounded())
            .await?;
        Ok(history.iter().rev().fold(initial, reducer))
    }

    pub async fn stats(&self) -> Result<BusStats, BusError> {
        self.request(|reply| Command::Stats { reply }).await
    }

    /// Stop the coordinator. Later calls on any handle fail with
    /// [`BusError::Closed`]. Handlers already spawned run to completion.
    pub async fn shutdown(&self) -> Result<(), BusError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }
}
