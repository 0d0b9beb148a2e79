//! Event bus - the coordinator actor and its handle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 EventBus (cloneable handle)                  │
//! │  publish / publish_sync / publish_batch                     │
//! │  subscribe / subscribe_all / unsubscribe / subscriptions    │
//! │  get_events / get_events_by_type / replay                   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │ mailbox (single consumer)
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Coordinator task                        │
//! │  SubscriptionRegistry + EventLog (owned, never shared)      │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌──────────────────┐               ┌─────────────────────────┐
//! │    Dispatcher    │               │       Broadcaster       │
//! │ one task/handler │               │ other nodes (no echo)   │
//! └──────────────────┘               └─────────────────────────┘
//! ```
//!
//! ## Delivery contracts
//! - `publish`: returns the event id at once; handlers run on their own tasks.
//! - `publish_sync`: waits for every handler's outcome, bounded by a timeout.
//!   Only the wait is bounded; handlers are not cancelled.
//! - `publish_batch`: one log extension, per-event dispatch, one broadcast.

mod command;
mod coordinator;
mod event_bus;

pub use coordinator::BusStats;
pub use event_bus::{EventBus, EventBusBuilder};
