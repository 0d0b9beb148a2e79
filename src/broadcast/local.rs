//! In-process cluster transport for tests and single-binary setups.
//!
//! Every node joined to the same [`LocalCluster`] sees frames broadcast by
//! the others on the topics it subscribed to. Nodes can be isolated to
//! simulate a transport outage.
//!
//! ## Example
//!
//! ```
//! use domain_bus::broadcast::{Broadcaster, LocalCluster};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cluster = LocalCluster::new();
//! let a = cluster.join("node-a");
//! let b = cluster.join("node-b");
//!
//! let mut inbox = b.subscribe("domain_events").unwrap();
//! a.broadcast("domain_events", vec![1, 2, 3]).unwrap();
//!
//! assert_eq!(inbox.recv().await, Some(vec![1, 2, 3]));
//! # }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::transport::{Broadcaster, FrameReceiver};
use crate::error::BroadcastError;

struct Member {
    node_id: String,
    topic: String,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct ClusterState {
    members: Vec<Member>,
    isolated: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct LocalCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl LocalCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the transport endpoint for `node_id`.
    pub fn join(&self, node_id: impl Into<String>) -> ClusterLink {
        ClusterLink {
            cluster: self.clone(),
            node_id: node_id.into(),
        }
    }

    /// Cut `node_id` off: its broadcasts fail and it receives nothing.
    pub fn isolate(&self, node_id: &str) {
        if let Ok(mut state) = self.lock() {
            state.isolated.insert(node_id.to_string());
        }
    }

    /// Undo [`isolate`](Self::isolate).
    pub fn heal(&self, node_id: &str) {
        if let Ok(mut state) = self.lock() {
            state.isolated.remove(node_id);
        }
    }

    /// Number of live subscriptions across all nodes.
    pub fn subscriptions(&self) -> usize {
        self.lock()
            .map(|state| state.members.iter().filter(|m| !m.tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ClusterState>, BroadcastError> {
        self.state
            .lock()
            .map_err(|_| BroadcastError::Unavailable("cluster state poisoned".into()))
    }
}

/// One node's endpoint on a [`LocalCluster`].
#[derive(Clone)]
pub struct ClusterLink {
    cluster: LocalCluster,
    node_id: String,
}

impl ClusterLink {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl Broadcaster for ClusterLink {
    fn broadcast(&self, topic: &str, frame: Vec<u8>) -> Result<(), BroadcastError> {
        let mut state = self.cluster.lock()?;
        if state.isolated.contains(&self.node_id) {
            return Err(BroadcastError::Unavailable(format!(
                "{} is isolated",
                self.node_id
            )));
        }

        state.members.retain(|m| !m.tx.is_closed());
        let ClusterState { members, isolated } = &*state;
        for member in members {
            if member.topic == topic
                && member.node_id != self.node_id
                && !isolated.contains(&member.node_id)
            {
                // A receiver that went away between retain and send is fine.
                let _ = member.tx.send(frame.clone());
            }
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<FrameReceiver, BroadcastError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.cluster.lock()?.members.push(Member {
            node_id: self.node_id.clone(),
            topic: topic.to_string(),
            tx,
        });
        Ok(rx)
    }
}
