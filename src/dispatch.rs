//! Handler invocation with fault isolation.
//!
//! ```text
//! invoke(handler, event)
//!     ├─ handler.handle(&event)   (panic caught via catch_unwind)
//!     ├─ Err / panic ──► warn!/error! + events.handler_error
//!     └─ always      ──► events.handled { duration_ms }
//! ```
//!
//! ## Rules
//! - A failing or panicking handler never affects the caller or siblings.
//! - Every invocation runs in its own tokio task, so a slow handler cannot
//!   delay the publisher or other handlers.
//! - No retries; a handler that wants retries does them itself.
//!
//! **Warning**: `AssertUnwindSafe` is used, so a handler that panics while
//! holding a lock on shared state may leave that state inconsistent.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{error, warn};

use crate::error::HandlerError;
use crate::event::Event;
use crate::handler::{HandlerOutcome, HandlerRef};
use crate::telemetry::{Telemetry, TelemetrySignal};

#[derive(Clone)]
pub struct Dispatcher {
    telemetry: Arc<dyn Telemetry>,
}

impl Dispatcher {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self { telemetry }
    }

    pub fn telemetry(&self) -> &Arc<dyn Telemetry> {
        &self.telemetry
    }

    /// Run one handler against one event and report the outcome.
    pub async fn invoke(&self, handler: &HandlerRef, event: &Event) -> HandlerOutcome {
        let started = Instant::now();
        // Calling `handle` is inside the guard too: a hand-written impl may
        // panic before it returns its future.
        let guarded = AssertUnwindSafe(async { handler.handler().handle(event).await });

        let result = match guarded.catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
        };
        let elapsed = started.elapsed();

        if let Err(err) = &result {
            match err {
                HandlerError::Panicked(_) => error!(
                    handler = handler.id(),
                    event_id = event.id(),
                    event_type = event.event_type(),
                    error = %err,
                    "event handler panicked"
                ),
                _ => warn!(
                    handler = handler.id(),
                    event_id = event.id(),
                    event_type = event.event_type(),
                    error = %err,
                    "event handler failed"
                ),
            }
            self.telemetry.emit(TelemetrySignal::handler_error(
                event,
                handler.id(),
                err.to_string(),
            ));
        }

        self.telemetry.emit(TelemetrySignal::handled(
            event,
            handler.id(),
            elapsed.as_secs_f64() * 1000.0,
        ));

        HandlerOutcome {
            handler: handler.id().to_string(),
            event_id: event.id().to_string(),
            result,
            elapsed,
        }
    }

    /// Fire-and-forget: spawn one task per handler and return immediately.
    pub fn spawn_all(&self, handlers: Vec<HandlerRef>, event: Arc<Event>) {
        for handler in handlers {
            let dispatcher = self.clone();
            let event = Arc::clone(&event);
            tokio::spawn(async move {
                dispatcher.invoke(&handler, &event).await;
            });
        }
    }

    /// Run every handler concurrently and collect outcomes in handler order.
    ///
    /// Each invocation is its own task; dropping the returned future stops
    /// the waiting, not the handlers.
    pub async fn run_all(
        &self,
        handlers: Vec<HandlerRef>,
        event: Arc<Event>,
    ) -> Vec<HandlerOutcome> {
        let tasks: Vec<_> = handlers
            .into_iter()
            .map(|handler| {
                let dispatcher = self.clone();
                let event = Arc::clone(&event);
                let id = handler.id().to_string();
                let join =
                    tokio::spawn(async move { dispatcher.invoke(&handler, &event).await });
                (id, join)
            })
            .collect();

        let (ids, joins): (Vec<String>, Vec<_>) = tasks.into_iter().unzip();
        join_all(joins)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, handler)| match joined {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let err = HandlerError::Other(Box::new(join_err));
                    error!(
                        handler = %handler,
                        event_id = event.id(),
                        event_type = event.event_type(),
                        error = %err,
                        "event handler task failed"
                    );
                    self.telemetry.emit(TelemetrySignal::handler_error(
                        &event,
                        &handler,
                        err.to_string(),
                    ));
                    HandlerOutcome {
                        handler,
                        event_id: event.id().to_string(),
                        result: Err(err),
                        elapsed: Default::default(),
                    }
                }
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
