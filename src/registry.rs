//! Subscription registry: event type -> handlers.
//!
//! Owned by the coordinator; never shared across tasks.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::event::WILDCARD;
use crate::handler::HandlerRef;

/// Result of a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscribed {
    Added,
    AlreadySubscribed,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: HashMap<String, VecDeque<HandlerRef>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`. Newest registrations go first.
    pub fn subscribe(&mut self, event_type: &str, handler: HandlerRef) -> Subscribed {
        let entry = self.handlers.entry(event_type.to_string()).or_default();
        if entry.iter().any(|h| h == &handler) {
            return Subscribed::AlreadySubscribed;
        }
        entry.push_front(handler);
        Subscribed::Added
    }

    /// Remove the handler with `handler_id` from `event_type`.
    ///
    /// Returns whether anything was removed. Empty entries are dropped.
    pub fn unsubscribe(&mut self, event_type: &str, handler_id: &str) -> bool {
        let Some(entry) = self.handlers.get_mut(event_type) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|h| h.id() != handler_id);
        let removed = entry.len() != before;
        if entry.is_empty() {
            self.handlers.remove(event_type);
        }
        removed
    }

    /// Handlers for an event of `event_type`: type-specific ones, then
    /// wildcard ones not already listed.
    pub fn resolve(&self, event_type: &str) -> Vec<HandlerRef> {
        let specific = self.handlers.get(event_type).into_iter().flatten();
        let wildcard = self.handlers.get(WILDCARD).into_iter().flatten();

        let mut resolved: Vec<HandlerRef> = Vec::new();
        for handler in specific.chain(wildcard) {
            if !resolved.contains(handler) {
                resolved.push(handler.clone());
            }
        }
        resolved
    }

    /// Snapshot of the registry as `event_type -> handler ids`.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.handlers
            .iter()
            .map(|(event_type, handlers)| {
                (
                    event_type.clone(),
                    handlers.iter().map(|h| h.id().to_string()).collect(),
                )
            })
            .collect()
    }

    /// Total number of (event type, handler) pairs.
    pub fn len(&self) -> usize {
        self.handlers.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
