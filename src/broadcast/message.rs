//! Broadcast envelopes and their wire codec.
//!
//! Two shapes travel on the topic: a single event and a batch. Frames are
//! `bitcode`-encoded; payloads ride inside as JSON bytes since they are
//! opaque to the bus.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::BroadcastError;
use crate::event::{Event, EventMetadata};

/// A message exchanged between nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastMessage {
    Event { origin: String, event: Event },
    Batch { origin: String, events: Vec<Event> },
}

impl BroadcastMessage {
    pub fn single(origin: impl Into<String>, event: Event) -> Self {
        BroadcastMessage::Event {
            origin: origin.into(),
            event,
        }
    }

    pub fn batch(origin: impl Into<String>, events: Vec<Event>) -> Self {
        BroadcastMessage::Batch {
            origin: origin.into(),
            events,
        }
    }

    /// Node that published the event(s).
    pub fn origin(&self) -> &str {
        match self {
            BroadcastMessage::Event { origin, .. } | BroadcastMessage::Batch { origin, .. } => {
                origin
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BroadcastMessage::Event { .. } => 1,
            BroadcastMessage::Batch { events, .. } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_events(self) -> Vec<Event> {
        match self {
            BroadcastMessage::Event { event, .. } => vec![event],
            BroadcastMessage::Batch { events, .. } => events,
        }
    }

    /// Encode into a transport frame.
    pub fn encode(&self) -> Result<Vec<u8>, BroadcastError> {
        let wire = match self {
            BroadcastMessage::Event { origin, event } => WireMessage::Event {
                origin: origin.clone(),
                event: WireEvent::from_event(event)?,
            },
            BroadcastMessage::Batch { origin, events } => WireMessage::Batch {
                origin: origin.clone(),
                events: events
                    .iter()
                    .map(WireEvent::from_event)
                    .collect::<Result<_, _>>()?,
            },
        };
        Ok(bitcode::serialize(&wire)?)
    }

    /// Decode a transport frame.
    pub fn decode(frame: &[u8]) -> Result<Self, BroadcastError> {
        let wire: WireMessage = bitcode::deserialize(frame)?;
        Ok(match wire {
            WireMessage::Event { origin, event } => BroadcastMessage::Event {
                origin,
                event: event.into_event()?,
            },
            WireMessage::Batch { origin, events } => BroadcastMessage::Batch {
                origin,
                events: events
                    .into_iter()
                    .map(WireEvent::into_event)
                    .collect::<Result<_, _>>()?,
            },
        })
    }
}

#[derive(Serialize, Deserialize)]
enum WireMessage {
    Event { origin: String, event: WireEvent },
    Batch { origin: String, events: Vec<WireEvent> },
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    id: String,
    event_type: String,
    aggregate_type: Option<String>,
    aggregate_id: Option<String>,
    payload: Vec<u8>,
    user_id: Option<String>,
    correlation_id: String,
    causation_id: Option<String>,
    source: String,
    occurred_at_micros: i64,
    version: u32,
}

impl WireEvent {
    fn from_event(event: &Event) -> Result<Self, BroadcastError> {
        let meta = event.metadata();
        Ok(Self {
            id: event.id().to_string(),
            event_type: event.event_type().to_string(),
            aggregate_type: event.aggregate_type().map(str::to_string),
            aggregate_id: event.aggregate_id().map(str::to_string),
            payload: serde_json::to_vec(event.payload())?,
            user_id: meta.user_id.clone(),
            correlation_id: meta.correlation_id.clone(),
            causation_id: meta.causation_id.clone(),
            source: meta.source.clone(),
            occurred_at_micros: event.occurred_at().timestamp_micros(),
            version: event.version(),
        })
    }

    fn into_event(self) -> Result<Event, BroadcastError> {
        let occurred_at = DateTime::from_timestamp_micros(self.occurred_at_micros).ok_or_else(
            || BroadcastError::Codec(format!("timestamp out of range: {}", self.occurred_at_micros)),
        )?;
        Ok(Event::restore(
            self.id,
            self.event_type,
            self.aggregate_type,
            self.aggregate_id,
            serde_json::from_slice(&self.payload)?,
            EventMetadata {
                user_id: self.user_id,
                correlation_id: self.correlation_id,
                causation_id: self.causation_id,
                source: self.source,
            },
            occurred_at,
            self.version,
        ))
    }
}
