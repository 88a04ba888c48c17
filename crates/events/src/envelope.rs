use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Event;

/// Envelope for a persisted event, containing stream metadata.
///
/// This is the unit an event store hands back after an append.
///
/// Notes:
/// - **Append-only**: `sequence_number` is 1-based and monotonically increasing per stream.
/// - `payload` is the typed domain event; its `aggregate_id()` is the stream key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    /// Monotonically increasing position in the aggregate stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(event_id: Uuid, sequence_number: u64, payload: E) -> Self {
        Self {
            event_id,
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    pub fn aggregate_id(&self) -> E::AggregateId {
        self.payload.aggregate_id()
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
