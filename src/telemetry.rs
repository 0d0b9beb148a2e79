//! Telemetry signals emitted by the bus.
//!
//! | Signal                  | Measurement   | Metadata                                   |
//! |-------------------------|---------------|--------------------------------------------|
//! | `events.published`      | count = 1     | type, aggregate_type, event_id             |
//! | `events.handled`        | duration_ms   | type, handler, event_id                    |
//! | `events.handler_error`  | count = 1     | type, handler, event_id, error             |
//!
//! Signals go to a [`Telemetry`] sink. [`TracingTelemetry`] (the default)
//! turns them into `tracing` events; [`RecordingTelemetry`] keeps them in
//! memory.

use std::sync::{Arc, Mutex};

use crate::event::Event;

pub const PUBLISHED: &str = "events.published";
pub const HANDLED: &str = "events.handled";
pub const HANDLER_ERROR: &str = "events.handler_error";

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetrySignal {
    Published {
        event_type: String,
        aggregate_type: Option<String>,
        event_id: String,
    },
    Handled {
        event_type: String,
        handler: String,
        event_id: String,
        duration_ms: f64,
    },
    HandlerError {
        event_type: String,
        handler: String,
        event_id: String,
        error: String,
    },
}

impl TelemetrySignal {
    pub(crate) fn published(event: &Event) -> Self {
        TelemetrySignal::Published {
            event_type: event.event_type().to_string(),
            aggregate_type: event.aggregate_type().map(str::to_string),
            event_id: event.id().to_string(),
        }
    }

    pub(crate) fn handled(event: &Event, handler: &str, duration_ms: f64) -> Self {
        TelemetrySignal::Handled {
            event_type: event.event_type().to_string(),
            handler: handler.to_string(),
            event_id: event.id().to_string(),
            duration_ms,
        }
    }

    pub(crate) fn handler_error(event: &Event, handler: &str, error: String) -> Self {
        TelemetrySignal::HandlerError {
            event_type: event.event_type().to_string(),
            handler: handler.to_string(),
            event_id: event.id().to_string(),
            error,
        }
    }

    /// Signal name, e.g. `events.handled`.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetrySignal::Published { .. } => PUBLISHED,
            TelemetrySignal::Handled { .. } => HANDLED,
            TelemetrySignal::HandlerError { .. } => HANDLER_ERROR,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            TelemetrySignal::Published { event_id, .. }
            | TelemetrySignal::Handled { event_id, .. }
            | TelemetrySignal::HandlerError { event_id, .. } => event_id,
        }
    }
}

/// Sink for telemetry signals. Must not block.
pub trait Telemetry: Send + Sync + 'static {
    fn emit(&self, signal: TelemetrySignal);
}

/// Emits every signal as a `tracing` event on target `domain_bus::telemetry`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn emit(&self, signal: TelemetrySignal) {
        match signal {
            TelemetrySignal::Published {
                event_type,
                aggregate_type,
                event_id,
            } => tracing::debug!(
                target: "domain_bus::telemetry",
                signal = PUBLISHED,
                count = 1u64,
                event_type = %event_type,
                aggregate_type = aggregate_type.as_deref(),
                event_id = %event_id,
            ),
            TelemetrySignal::Handled {
                event_type,
                handler,
                event_id,
                duration_ms,
            } => tracing::debug!(
                target: "domain_bus::telemetry",
                signal = HANDLED,
                duration_ms,
                event_type = %event_type,
                handler = %handler,
                event_id = %event_id,
            ),
            TelemetrySignal::HandlerError {
                event_type,
                handler,
                event_id,
                error,
            } => tracing::debug!(
                target: "domain_bus::telemetry",
                signal = HANDLER_ERROR,
                count = 1u64,
                event_type = %event_type,
                handler = %handler,
                event_id = %event_id,
                error = %error,
            ),
        }
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    signals: Arc<Mutex<Vec<TelemetrySignal>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All signals recorded so far, oldest first.
    pub fn signals(&self) -> Vec<TelemetrySignal> {
        match self.signals.lock() {
            Ok(signals) => signals.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Recorded signals with the given name.
    pub fn named(&self, name: &str) -> Vec<TelemetrySignal> {
        self.signals()
            .into_iter()
            .filter(|s| s.name() == name)
            .collect()
    }

    pub fn clear(&self) {
        match self.signals.lock() {
            Ok(mut signals) => signals.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Telemetry for RecordingTelemetry {
    fn emit(&self, signal: TelemetrySignal) {
        match self.signals.lock() {
            Ok(mut signals) => signals.push(signal),
            Err(poisoned) => poisoned.into_inner().push(signal),
        }
    }
}
