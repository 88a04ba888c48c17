use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - **scoped** to exactly one aggregate stream
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Identifier of the stream this event belongs to.
    type AggregateId: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Stable event name/type identifier (e.g. "account.debited").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// The aggregate this event mutates.
    ///
    /// This is the storage key and may differ from any ids carried in the payload.
    fn aggregate_id(&self) -> Self::AggregateId;
}
