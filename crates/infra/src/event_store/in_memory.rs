use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use uuid::Uuid;

use ledger_core::ExpectedVersion;
use ledger_events::{Event, EventEnvelope};

use super::r#trait::{EventStore, EventStoreError};

#[derive(Debug)]
struct Streams<E: Event> {
    by_id: HashMap<E::AggregateId, Vec<EventEnvelope<E>>>,
    /// Stream keys in order of first append.
    order: Vec<E::AggregateId>,
}

impl<E: Event> Default for Streams<E> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            order: Vec::new(),
        }
    }
}

/// In-memory append-only event store.
///
/// Memory-resident for the lifetime of the process; nothing is ever compacted.
#[derive(Debug)]
pub struct InMemoryEventStore<E: Event> {
    streams: RwLock<Streams<E>>,
}

impl<E: Event> Default for InMemoryEventStore<E> {
    fn default() -> Self {
        Self {
            streams: RwLock::new(Streams::default()),
        }
    }
}

impl<E: Event> InMemoryEventStore<E> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: Event> EventStore<E> for InMemoryEventStore<E> {
    fn append(
        &self,
        event: E,
        expected_version: ExpectedVersion,
    ) -> Result<EventEnvelope<E>, EventStoreError> {
        let aggregate_id = event.aggregate_id();

        let mut guard = self.streams.write().map_err(|_| EventStoreError::Poisoned)?;
        let streams = &mut *guard;

        let current = streams
            .by_id
            .get(&aggregate_id)
            .map_or(0, |stream| stream.len() as u64);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "stream {aggregate_id}: expected {expected_version:?}, found {current}"
            )));
        }

        let stream = match streams.by_id.entry(aggregate_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                streams.order.push(aggregate_id);
                entry.insert(Vec::new())
            }
        };

        let stored = EventEnvelope::new(Uuid::now_v7(), current + 1, event);
        stream.push(stored.clone());
        Ok(stored)
    }

    fn load_stream(&self, aggregate_id: E::AggregateId) -> Result<Vec<EventEnvelope<E>>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams.by_id.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn exists(&self, aggregate_id: E::AggregateId) -> Result<bool, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams.by_id.contains_key(&aggregate_id))
    }

    fn stream_ids(&self) -> Result<Vec<E::AggregateId>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams.order.clone())
    }
}
