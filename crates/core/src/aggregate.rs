//! Aggregate root traits and the replay fold for event-sourced domain models.

use crate::error::DomainResult;

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// For event-sourced aggregates this is the number of events applied, which
    /// equals the sequence number of the last event in the stream.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an append.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the stream to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// Event-sourced aggregate semantics (pure, deterministic).
///
/// State is never stored: it is rebuilt by folding the aggregate's ordered
/// event stream over `Default::default()` via [`replay`]. Aggregates must not
/// perform IO or side effects.
pub trait Aggregate: AggregateRoot + Default {
    type Event: Clone + core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Every event kind must have a handler. An `Err` means the stream itself
    /// is inconsistent (e.g. an event that could never have been accepted) and
    /// must not be silently ignored.
    fn apply(&mut self, event: &Self::Event) -> DomainResult<()>;
}

/// Rebuild an aggregate by applying `events` in order to a zero-value instance.
///
/// Deterministic: the same event list always yields the same state.
pub fn replay<'a, A, I>(events: I) -> DomainResult<A>
where
    A: Aggregate,
    A::Event: 'a,
    I: IntoIterator<Item = &'a A::Event>,
{
    events.into_iter().try_fold(A::default(), |mut aggregate, event| {
        aggregate.apply(event)?;
        Ok(aggregate)
    })
}
