//! Cross-node broadcast.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌──────────────────────┐
//! │ Coordinator (node A) │                         │ Coordinator (node B) │
//! │  publish / batch     │                         │  remote listener     │
//! └──────────┬───────────┘                         └──────────▲───────────┘
//!            │ BroadcastMessage::encode                       │ decode
//!            ▼                                                │
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │              Broadcaster (opaque pub/sub transport)                   │
//! │  broadcast(topic, frame) / subscribe(topic)                          │
//! └──────────────────────────────────────────────────────────────────────┘
//!          │                          │                          │
//!          ▼                          ▼                          ▼
//!   ┌─────────────┐          ┌──────────────┐        ┌────────────────────┐
//!   │ Standalone  │          │ LocalCluster │        │ Redis / NATS / ... │
//!   │ (no peers)  │          │ (in-process) │        │    (external)      │
//!   └─────────────┘          └──────────────┘        └────────────────────┘
//! ```
//!
//! Remote events are dispatched locally and never re-broadcast.

#[cfg(feature = "cluster")]
mod local;
mod message;
mod transport;

#[cfg(feature = "cluster")]
pub use local::{ClusterLink, LocalCluster};
pub use message::BroadcastMessage;
pub use transport::{Broadcaster, FrameReceiver, Standalone};
