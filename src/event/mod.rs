//! Domain events - the immutable values carried by the bus.

#[allow(clippy::module_inception)]
mod event;
pub mod id;
mod options;

pub use event::{Event, EventMetadata, EVENT_VERSION, WILDCARD};
pub use options::PublishOptions;
