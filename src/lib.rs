//! # domain_bus
//!
//! An in-process domain event bus: publish typed domain events, dispatch
//! them to isolated async handlers, keep a bounded recent history for
//! querying and replay, and propagate events to other nodes.
//!
//! ```text
//! Event::build ──► EventBus ──► Coordinator ──► EventLog (append)
//!                                   │       ──► Dispatcher (handlers)
//!                                   │       ──► Broadcaster (other nodes)
//!                                   ▼
//!                    queries: get_events / get_events_by_type / replay
//! ```
//!
//! See [`EventBus`] for the operations and [`broadcast`] for the cluster
//! transport contract.

pub mod broadcast;
mod bus;
mod config;
mod dispatch;
mod error;
mod event;
mod handler;
mod log;
mod registry;
pub mod telemetry;

pub use bus::{BusStats, EventBus, EventBusBuilder};
pub use config::{
    default_node_id, BusConfig, DEFAULT_LOG_CAPACITY, DEFAULT_MAILBOX_CAPACITY, DEFAULT_QUERY_LIMIT,
    DEFAULT_SYNC_TIMEOUT, DEFAULT_TOPIC,
};
pub use dispatch::Dispatcher;
pub use error::{BroadcastError, BusError, ConfigError, HandlerError};
pub use event::{id, Event, EventMetadata, PublishOptions, EVENT_VERSION, WILDCARD};
pub use handler::{FnHandler, Handler, HandlerOutcome, HandlerRef, HandlerResult};
pub use log::{EventLog, EventQuery};
pub use registry::{Subscribed, SubscriptionRegistry};
pub use telemetry::{RecordingTelemetry, Telemetry, TelemetrySignal, TracingTelemetry};
