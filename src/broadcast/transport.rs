//! Transport contract for cross-node broadcast.

use tokio::sync::mpsc;

use crate::error::BroadcastError;

/// Incoming frames for one topic.
pub type FrameReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

/// Publish/subscribe primitive reaching the other nodes of a cluster.
///
/// Implementations might include:
/// - [`Standalone`] - single node, nothing to reach
/// - [`LocalCluster`](super::LocalCluster) - in-process nodes, for tests
/// - adapters over Redis pub/sub, NATS, or a process-group library
///
/// ## Contract
/// - `broadcast` is at-most-once and best effort. It delivers `frame` to
///   every node subscribed to `topic` except the sender, and must not block.
/// - `subscribe` registers this node for future frames on `topic`.
pub trait Broadcaster: Send + Sync + 'static {
    fn broadcast(&self, topic: &str, frame: Vec<u8>) -> Result<(), BroadcastError>;

    fn subscribe(&self, topic: &str) -> Result<FrameReceiver, BroadcastError>;
}

/// Broadcaster for a node with no peers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standalone;

impl Broadcaster for Standalone {
    fn broadcast(&self, _topic: &str, _frame: Vec<u8>) -> Result<(), BroadcastError> {
        Ok(())
    }

    fn subscribe(&self, _topic: &str) -> Result<FrameReceiver, BroadcastError> {
        // Sender dropped right away: the receiver reports end of stream.
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }
}
