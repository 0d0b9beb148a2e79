//! # Coordinator - single owner of bus state.
//!
//! All registry mutations, log appends, and dispatch-list snapshots happen
//! inside one task draining one mailbox. Callers never touch that state.
//!
//! ```text
//! EventBus (many clones) ──► mailbox ──► Coordinator::run()
//! remote listener ─────────┘               ├─► EventLog::append
//!                                          ├─► SubscriptionRegistry::resolve
//!                                          ├─► Dispatcher::spawn_all  (own tasks)
//!                                          └─► Broadcaster::broadcast (local only)
//! ```
//!
//! ## Rules
//! - Per publish: log append, then dispatch, then broadcast.
//! - Across publishes: log order is mailbox order.
//! - Remote messages are dispatched and logged, never re-broadcast.
//! - The mailbox is bounded; a full mailbox rejects publishes with
//!   `BusError::Overloaded` instead of growing.
//! - A broadcast failure is logged and counted; local delivery is unaffected.
//! - The coordinator stops on `Shutdown` or once every handle is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::command::Command;
use crate::broadcast::{BroadcastMessage, Broadcaster};
use crate::config::BusConfig;
use crate::dispatch::Dispatcher;
use crate::event::Event;
use crate::log::EventLog;
use crate::registry::SubscriptionRegistry;
use crate::telemetry::TelemetrySignal;

/// Point-in-time counters of a running bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Events currently held in the log.
    pub logged: usize,
    /// Events dropped from the log to respect its capacity.
    pub evicted: u64,
    /// Events published on this node.
    pub published: u64,
    /// Events received from other nodes.
    pub remote_received: u64,
    /// Outbound broadcasts that failed.
    pub broadcast_failures: u64,
    /// (event type, handler) pairs registered.
    pub subscriptions: usize,
}

pub(crate) struct Coordinator {
    config: Arc<BusConfig>,
    registry: SubscriptionRegistry,
    log: EventLog,
    dispatcher: Dispatcher,
    broadcaster: Arc<dyn Broadcaster>,
    stats: BusStats,
}

impl Coordinator {
    pub(crate) fn new(
        config: Arc<BusConfig>,
        dispatcher: Dispatcher,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            log: EventLog::with_capacity(config.log_capacity),
            registry: SubscriptionRegistry::new(),
            config,
            dispatcher,
            broadcaster,
            stats: BusStats::default(),
        }
    }

    /// Spawn the coordinator and its remote listener.
    pub(crate) fn spawn(self) -> mpsc::Sender<Command> {
        let (tx, rx) = mpsc::channel(self.config.mailbox_capacity);
        let listener = self.spawn_remote_listener(&tx);
        tokio::spawn(self.run(rx, listener));
        tx
    }

    /// Forward decoded frames from other nodes into the mailbox.
    ///
    /// Holds only a weak sender, so it never keeps the coordinator alive.
    fn spawn_remote_listener(
        &self,
        tx: &mpsc::Sender<Command>,
    ) -> Option<JoinHandle<()>> {
        let mut frames = match self.broadcaster.subscribe(&self.config.topic) {
            Ok(frames) => frames,
            Err(err) => {
                warn!(
                    node = %self.config.node_id,
                    topic = %self.config.topic,
                    error = %err,
                    "broadcast subscribe failed, running local-only"
                );
                return None;
            }
        };

        let weak = tx.downgrade();
        let node_id = self.config.node_id.clone();

        Some(tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let message = match BroadcastMessage::decode(&frame) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(
                            node = %node_id,
                            error = %err,
                            "dropping undecodable broadcast frame"
                        );
                        continue;
                    }
                };
                // The transport never hands a node its own frames, so the
                // origin id is informational only.
                let Some(tx) = weak.upgrade() else { break };
                if tx.send(Command::Remote(message)).await.is_err() {
                    break;
                }
            }
            debug!(node = %node_id, "remote listener stopped");
        }))
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Command>,
        listener: Option<JoinHandle<()>>,
    ) {
        info!(
            node = %self.config.node_id,
            log_capacity = self.config.log_capacity,
            mailbox_capacity = self.config.mailbox_capacity,
            topic = %self.config.topic,
            "event bus started"
        );

        while let Some(command) = inbox.recv().await {
            if let Command::Shutdown { reply } = command {
                let _ = reply.send(());
                break;
            }
            self.handle(command);
        }

        if let Some(listener) = listener {
            listener.abort();
        }
        info!(node = %self.config.node_id, "event bus stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Publish(event) => {
                self.record(&event);
                let handlers = self.registry.resolve(event.event_type());
                self.dispatcher.spawn_all(handlers, Arc::clone(&event));
                self.broadcast(BroadcastMessage::single(
                    self.config.node_id.clone(),
                    Event::clone(&event),
                ));
            }
            Command::PublishSync { event, reply } => {
                self.record(&event);
                let handlers = self.registry.resolve(event.event_type());
                // Caller stopped waiting; the handlers are still owed the event.
                if let Err(handlers) = reply.send(handlers) {
                    self.dispatcher.spawn_all(handlers, Arc::clone(&event));
                }
                self.broadcast(BroadcastMessage::single(
                    self.config.node_id.clone(),
                    Event::clone(&event),
                ));
            }
            Command::PublishBatch(events) => {
                let evicted = self.log.extend(events.iter().map(|e| (**e).clone()));
                self.stats.evicted += evicted as u64;
                for event in &events {
                    self.stats.published += 1;
                    self.dispatcher
                        .telemetry()
                        .emit(TelemetrySignal::published(event));
                    let handlers = self.registry.resolve(event.event_type());
                    self.dispatcher.spawn_all(handlers, Arc::clone(event));
                }
                self.broadcast(BroadcastMessage::batch(
                    self.config.node_id.clone(),
                    events.iter().map(|e| (**e).clone()).collect(),
                ));
            }
            Command::Remote(message) => {
                debug!(
                    node = %self.config.node_id,
                    origin = message.origin(),
                    events = message.len(),
                    "received remote events"
                );
                for event in message.into_events() {
                    self.stats.remote_received += 1;
                    self.stats.evicted += self.log.append(event.clone()) as u64;
                    let handlers = self.registry.resolve(event.event_type());
                    self.dispatcher.spawn_all(handlers, Arc::new(event));
                }
            }
            Command::Subscribe {
                event_type,
                handler,
                reply,
            } => {
                let outcome = self.registry.subscribe(&event_type, handler);
                let _ = reply.send(outcome);
            }
            Command::Unsubscribe {
                event_type,
                handler_id,
                reply,
            } => {
                let removed = self.registry.unsubscribe(&event_type, &handler_id);
                let _ = reply.send(removed);
            }
            Command::Subscriptions { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::EventsByAggregate {
                aggregate_type,
                aggregate_id,
                query,
                reply,
            } => {
                let events = self.log.by_aggregate(&aggregate_type, &aggregate_id, query);
                let _ = reply.send(events);
            }
            Command::EventsByType {
                event_type,
                query,
                reply,
            } => {
                let _ = reply.send(self.log.by_type(&event_type, query));
            }
            Command::Stats { reply } => {
                let stats = BusStats {
                    logged: self.log.len(),
                    subscriptions: self.registry.len(),
                    ..self.stats
                };
                let _ = reply.send(stats);
            }
            // Handled in `run`.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Log a locally published event and report it.
    fn record(&mut self, event: &Event) {
        self.stats.evicted += self.log.append(event.clone()) as u64;
        self.stats.published += 1;
        self.dispatcher
            .telemetry()
            .emit(TelemetrySignal::published(event));
        debug!(
            event_id = event.id(),
            event_type = event.event_type(),
            "event published"
        );
    }

    fn broadcast(&mut self, message: BroadcastMessage) {
        let result = message
            .encode()
            .and_then(|frame| self.broadcaster.broadcast(&self.config.topic, frame));

        if let Err(err) = result {
            self.stats.broadcast_failures += 1;
            warn!(
                node = %self.config.node_id,
                events = message.len(),
                error = %err,
                "broadcast failed, delivered locally only"
            );
        }
    }
}
