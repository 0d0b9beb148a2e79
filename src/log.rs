//! Bounded in-memory event log.
//!
//! A best-effort audit window, newest-first. When full, appending drops the
//! oldest entries. Nothing here survives a restart.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_LOG_CAPACITY, DEFAULT_QUERY_LIMIT};
use crate::event::Event;

/// Read options for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    /// Maximum number of events returned.
    pub limit: usize,
    /// Only events that occurred strictly after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUERY_LIMIT,
            since: None,
        }
    }
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// No limit and no time bound.
    pub fn unbounded() -> Self {
        Self {
            limit: usize::MAX,
            since: None,
        }
    }

    fn admits(&self, event: &Event) -> bool {
        self.since.map_or(true, |since| event.occurred_at() > since)
    }
}

pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    /// Create a log holding at most `capacity` events (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Append one event at the head, evicting the oldest when full.
    ///
    /// Returns how many events were evicted.
    pub fn append(&mut self, event: Event) -> usize {
        self.events.push_front(event);
        self.evict()
    }

    /// Append a batch in order; the last event of the batch ends up newest.
    pub fn extend<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events {
            self.events.push_front(event);
        }
        self.evict()
    }

    fn evict(&mut self) -> usize {
        let excess = self.events.len().saturating_sub(self.capacity);
        self.events.truncate(self.capacity);
        excess
    }

    /// Events of one aggregate, newest-first.
    pub fn by_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        query: EventQuery,
    ) -> Vec<Event> {
        self.select(query, |e| e.is_for(aggregate_type, aggregate_id))
    }

    /// Events of one type, newest-first.
    pub fn by_type(&self, event_type: &str, query: EventQuery) -> Vec<Event> {
        self.select(query, |e| e.event_type() == event_type)
    }

    fn select<P>(&self, query: EventQuery, predicate: P) -> Vec<Event>
    where
        P: Fn(&Event) -> bool,
    {
        self.events
            .iter()
            .filter(|&e| predicate(e) && query.admits(e))
            .take(query.limit)
            .cloned()
            .collect()
    }

    /// Newest-first iterator over the whole log.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
