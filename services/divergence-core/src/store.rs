//! Append-only event store.
//!
//! One writer lock serialises `record`; readers take an [`EventSnapshot`],
//! an `Arc` to the log as it stood at that moment. A write that finds a
//! snapshot still alive copies the log before appending, so snapshots never
//! observe later or partial writes.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ValidationError;
use crate::event::{ActorGroup, Event, NewEvent};

/// Append-only, thread-safe collection of [`Event`]s.
#[derive(Debug, Default)]
pub struct EventStore {
    events: RwLock<Arc<Vec<Event>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an event. Returns the stored form.
    ///
    /// Amortised O(1) while no snapshot or query is alive. A write made
    /// while one is held clones the log once (O(n)) so the reader keeps
    /// its view; later writes append to the new copy. Drop snapshots
    /// before bulk ingestion.
    pub fn record(&self, event: NewEvent) -> Result<Event, ValidationError> {
        let mut guard = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let event = event.validate(guard.len() as u64)?;
        Arc::make_mut(&mut *guard).push(event.clone());
        Ok(event)
    }

    /// A consistent view of every event recorded so far.
    pub fn snapshot(&self) -> EventSnapshot {
        let guard = self.events.read().unwrap_or_else(PoisonError::into_inner);
        EventSnapshot {
            events: Arc::clone(&guard),
        }
    }

    /// Lazily iterate matching events in insertion order.
    pub fn query(&self, topic: Option<&str>, actor_group: Option<ActorGroup>) -> EventQuery {
        EventQuery {
            snapshot: self.snapshot(),
            position: 0,
            topic: topic.map(str::to_string),
            actor_group,
        }
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable view of the store at a point in time.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    events: Arc<Vec<Event>>,
}

impl EventSnapshot {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Borrowing counterpart of [`EventStore::query`].
    pub fn query<'a>(
        &'a self,
        topic: Option<&'a str>,
        actor_group: Option<ActorGroup>,
    ) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .filter(move |event| matches_filter(event, topic, actor_group))
    }

    /// Distinct topic names, ascending.
    pub fn topics(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|event| event.topic.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

fn matches_filter(event: &Event, topic: Option<&str>, actor_group: Option<ActorGroup>) -> bool {
    topic.map_or(true, |t| event.topic == t) && actor_group.map_or(true, |g| event.actor_group == g)
}

/// Owning iterator returned by [`EventStore::query`].
#[derive(Debug)]
pub struct EventQuery {
    snapshot: EventSnapshot,
    position: usize,
    topic: Option<String>,
    actor_group: Option<ActorGroup>,
}

impl Iterator for EventQuery {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(event) = self.snapshot.events.get(self.position) {
            self.position += 1;
            if matches_filter(event, self.topic.as_deref(), self.actor_group) {
                return Some(event.clone());
            }
        }
        None
    }
}
