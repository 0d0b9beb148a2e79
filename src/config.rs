//! Bus configuration.
//!
//! ## Environment
//! [`BusConfig::from_env`] starts from the defaults and overrides:
//! - `DOMAIN_BUS_NODE_ID`
//! - `DOMAIN_BUS_LOG_CAPACITY` (events, min 1)
//! - `DOMAIN_BUS_SYNC_TIMEOUT_MS`
//! - `DOMAIN_BUS_TOPIC`
//! - `DOMAIN_BUS_MAILBOX_CAPACITY` (commands, min 1)
//!
//! ## Memory bounds
//! The log holds at most `log_capacity` events. The coordinator mailbox
//! holds at most `mailbox_capacity` pending commands; publishing into a
//! full mailbox fails with `BusError::Overloaded` rather than queueing.

use std::time::Duration;

use crate::error::ConfigError;

/// Default number of events retained in the log.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;
/// Default wait for `publish_sync`.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Default query limit for log reads.
pub const DEFAULT_QUERY_LIMIT: usize = 100;
/// Default number of commands the coordinator mailbox can hold.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 65_536;
/// Topic used for all cross-node event traffic.
pub const DEFAULT_TOPIC: &str = "domain_events";

/// Identifier of the current process, used when no node id is configured.
pub fn default_node_id() -> String {
    format!("node-{}", std::process::id())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Identity of this node; default `source` of published events.
    pub node_id: String,
    /// Maximum events kept in the log; oldest are dropped first.
    pub log_capacity: usize,
    /// Default deadline for synchronous publish.
    pub sync_timeout: Duration,
    /// Broadcast topic shared by all cooperating nodes.
    pub topic: String,
    /// Pending commands the coordinator accepts before publishes are refused.
    pub mailbox_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            topic: DEFAULT_TOPIC.to_string(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl BusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    /// Set the log capacity (clamped to at least 1).
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity.max(1);
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the mailbox capacity (clamped to at least 1).
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Load configuration from `DOMAIN_BUS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(node_id) = lookup("DOMAIN_BUS_NODE_ID").filter(|v| !v.trim().is_empty()) {
            config.node_id = node_id;
        }
        if let Some(raw) = lookup("DOMAIN_BUS_LOG_CAPACITY") {
            let capacity = parse_number("DOMAIN_BUS_LOG_CAPACITY", &raw)?;
            config = config.with_log_capacity(capacity as usize);
        }
        if let Some(raw) = lookup("DOMAIN_BUS_SYNC_TIMEOUT_MS") {
            let millis = parse_number("DOMAIN_BUS_SYNC_TIMEOUT_MS", &raw)?;
            config.sync_timeout = Duration::from_millis(millis);
        }
        if let Some(topic) = lookup("DOMAIN_BUS_TOPIC").filter(|v| !v.trim().is_empty()) {
            config.topic = topic;
        }
        if let Some(raw) = lookup("DOMAIN_BUS_MAILBOX_CAPACITY") {
            let capacity = parse_number("DOMAIN_BUS_MAILBOX_CAPACITY", &raw)?;
            config = config.with_mailbox_capacity(capacity as usize);
        }

        Ok(config)
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
