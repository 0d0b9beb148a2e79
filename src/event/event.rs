use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::id;
use super::options::PublishOptions;
use crate::config::default_node_id;
use crate::error::{BusError, HandlerError};

/// Event type that subscribes a handler to every event.
pub const WILDCARD: &str = "*";

/// Schema revision stamped on every event.
pub const EVENT_VERSION: u32 = 1;

/// Provenance attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    pub user_id: Option<String>,
    pub correlation_id: String,
    pub causation_id: Option<String>,
    /// Node or process that originated the event.
    pub source: String,
}

/// An immutable record of one domain occurrence.
///
/// `id` and `occurred_at` are assigned by [`Event::build`] and cannot be
/// supplied by the caller. All fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    aggregate_type: Option<String>,
    aggregate_id: Option<String>,
    payload: Value,
    metadata: EventMetadata,
    occurred_at: DateTime<Utc>,
    version: u32,
}

impl Event {
    /// Build a new event, assigning its id and timestamp.
    ///
    /// Fails with [`BusError::InvalidEvent`] when `event_type` is empty.
    ///
    /// ```
    /// use domain_bus::{Event, PublishOptions};
    /// use serde_json::json;
    ///
    /// let event = Event::build(
    ///     "message_sent",
    ///     json!({"body": "hi"}),
    ///     PublishOptions::new().aggregate("conversation", "c-1"),
    /// )
    /// .unwrap();
    ///
    /// assert!(event.id().starts_with("evt_"));
    /// assert_eq!(event.event_type(), "message_sent");
    /// assert!(event.metadata().correlation_id.starts_with("corr_"));
    /// ```
    pub fn build(
        event_type: impl Into<String>,
        payload: Value,
        options: PublishOptions,
    ) -> Result<Self, BusError> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(BusError::InvalidEvent("event type is required".into()));
        }
        if event_type == WILDCARD {
            return Err(BusError::InvalidEvent(
                "the wildcard type cannot be published".into(),
            ));
        }

        let PublishOptions {
            aggregate_type,
            aggregate_id,
            user_id,
            correlation_id,
            causation_id,
            source,
        } = options;

        Ok(Self {
            id: id::event_id(),
            event_type,
            aggregate_type,
            aggregate_id,
            payload,
            metadata: EventMetadata {
                user_id,
                correlation_id: correlation_id.unwrap_or_else(id::correlation_id),
                causation_id,
                source: source.unwrap_or_else(default_node_id),
            },
            occurred_at: Utc::now(),
            version: EVENT_VERSION,
        })
    }

    /// Rebuild an event received from another node.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: String,
        event_type: String,
        aggregate_type: Option<String>,
        aggregate_id: Option<String>,
        payload: Value,
        metadata: EventMetadata,
        occurred_at: DateTime<Utc>,
        version: u32,
    ) -> Self {
        Self {
            id,
            event_type,
            aggregate_type,
            aggregate_id,
            payload,
            metadata,
            occurred_at,
            version,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_type(&self) -> Option<&str> {
        self.aggregate_type.as_deref()
    }

    pub fn aggregate_id(&self) -> Option<&str> {
        self.aggregate_id.as_deref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// True when the event belongs to the given aggregate.
    pub fn is_for(&self, aggregate_type: &str, aggregate_id: &str) -> bool {
        self.aggregate_type.as_deref() == Some(aggregate_type)
            && self.aggregate_id.as_deref() == Some(aggregate_id)
    }

    /// Decode the payload into a typed value.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
