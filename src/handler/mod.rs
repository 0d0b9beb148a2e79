//! Event handlers.
//!
//! A handler is anything that can take an [`Event`] and report success or
//! failure. Two shapes are supported and adapted to the same capability:
//!
//! - **Handler objects**: types implementing [`Handler`], registered by value
//!   or shared behind an `Arc`.
//! - **Closures**: `Fn(Event) -> impl Future<Output = HandlerResult>`, wrapped
//!   by [`HandlerRef::from_fn`] under a caller-chosen name.
//!
//! Handlers are identified by name. The registry uses that identity for
//! idempotent subscribe and for unsubscribe.
//!
//! ## Example
//!
//! ```
//! use async_trait::async_trait;
//! use domain_bus::{Event, Handler, HandlerRef, HandlerResult};
//!
//! struct AuditTrail;
//!
//! #[async_trait]
//! impl Handler for AuditTrail {
//!     fn name(&self) -> &str {
//!         "audit_trail"
//!     }
//!
//!     async fn handle(&self, event: &Event) -> HandlerResult {
//!         tracing::info!(event_id = event.id(), "audited");
//!         Ok(())
//!     }
//! }
//!
//! let object = HandlerRef::new(AuditTrail);
//! let closure = HandlerRef::from_fn("notify", |_event| async { Ok(()) });
//! assert_eq!(object.id(), "audit_trail");
//! assert_eq!(closure.id(), "notify");
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::event::Event;

/// Result of one handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Capability to handle a single event.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Stable identity of this handler.
    fn name(&self) -> &str;

    async fn handle(&self, event: &Event) -> HandlerResult;
}

/// Closure adapter implementing [`Handler`].
pub struct FnHandler<F, Fut> {
    name: String,
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _fut: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F, Fut>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> HandlerResult {
        (self.f)(event.clone()).await
    }
}

/// A registered handler: its identity plus the shared capability.
///
/// Cheap to clone. Two refs are equal when their ids are equal.
#[derive(Clone)]
pub struct HandlerRef {
    id: Arc<str>,
    handler: Arc<dyn Handler>,
}

impl HandlerRef {
    /// Register a handler object by value.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self::shared(Arc::new(handler))
    }

    /// Register a handler object that is shared with other owners.
    pub fn shared(handler: Arc<dyn Handler>) -> Self {
        Self {
            id: Arc::from(handler.name()),
            handler,
        }
    }

    /// Register an async closure under `name`.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(FnHandler::new(name, f))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerRef {}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRef").field(&self.id).finish()
    }
}

impl<H: Handler> From<H> for HandlerRef {
    fn from(handler: H) -> Self {
        HandlerRef::new(handler)
    }
}

impl From<Arc<dyn Handler>> for HandlerRef {
    fn from(handler: Arc<dyn Handler>) -> Self {
        HandlerRef::shared(handler)
    }
}

/// What happened when one handler saw one event.
#[derive(Debug)]
pub struct HandlerOutcome {
    pub handler: String,
    pub event_id: String,
    pub result: HandlerResult,
    pub elapsed: Duration,
}

impl HandlerOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
