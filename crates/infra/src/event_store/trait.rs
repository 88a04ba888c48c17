use std::sync::Arc;

use thiserror::Error;

use ledger_core::ExpectedVersion;
use ledger_events::{Event, EventEnvelope};

/// Event store operation error.
///
/// These are **infrastructure errors** (concurrency, poisoned state) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Append-only, per-aggregate event store.
///
/// Events are organized into **streams**, one per aggregate instance, keyed by
/// [`Event::aggregate_id`]. Within a stream, events carry 1-based, gapless,
/// monotonically increasing sequence numbers.
///
/// ## Append Semantics
///
/// `append()`:
/// - Checks optimistic concurrency (stream version must match `expected_version`)
/// - Assigns the next sequence number and an event id
/// - Creates the stream on first append
///
/// The check and the write happen under one critical section, so two concurrent
/// appends to the same stream can never both observe the same version.
///
/// ## Load Semantics
///
/// `load_stream()` returns the stream in append order, or an empty vector if the
/// aggregate has never been written.
pub trait EventStore<E: Event>: Send + Sync {
    /// Append a single event to its aggregate's stream.
    fn append(
        &self,
        event: E,
        expected_version: ExpectedVersion,
    ) -> Result<EventEnvelope<E>, EventStoreError>;

    /// Load the full stream for an aggregate.
    fn load_stream(&self, aggregate_id: E::AggregateId) -> Result<Vec<EventEnvelope<E>>, EventStoreError>;

    /// Whether any event has been appended for `aggregate_id`.
    fn exists(&self, aggregate_id: E::AggregateId) -> Result<bool, EventStoreError>;

    /// All stream keys, in order of first append.
    fn stream_ids(&self) -> Result<Vec<E::AggregateId>, EventStoreError>;
}

impl<E, S> EventStore<E> for Arc<S>
where
    E: Event,
    S: EventStore<E> + ?Sized,
{
    fn append(
        &self,
        event: E,
        expected_version: ExpectedVersion,
    ) -> Result<EventEnvelope<E>, EventStoreError> {
        (**self).append(event, expected_version)
    }

    fn load_stream(&self, aggregate_id: E::AggregateId) -> Result<Vec<EventEnvelope<E>>, EventStoreError> {
        (**self).load_stream(aggregate_id)
    }

    fn exists(&self, aggregate_id: E::AggregateId) -> Result<bool, EventStoreError> {
        (**self).exists(aggregate_id)
    }

    fn stream_ids(&self) -> Result<Vec<E::AggregateId>, EventStoreError> {
        (**self).stream_ids()
    }
}
