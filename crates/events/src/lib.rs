//! Event contracts shared by the domain and infrastructure layers.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
