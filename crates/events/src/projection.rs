use stockflow_core::DomainError;

use crate::{Event, EventEnvelope};

/// A projection builds derived state from an append-only event stream.
///
/// Derived state is **disposable**: it can be dropped and rebuilt by replaying
/// the stream from the start, and the rebuild must match what was maintained
/// live. [`ProjectionRunner`](crate::ProjectionRunner) enforces ordering; the
/// projection enforces domain rules.
pub trait Projection {
    type Ev: Event;

    /// Apply a single event.
    ///
    /// Returning an error means the stream contains a fact the projection
    /// cannot accept (for example a movement that would go negative), which is
    /// a corruption signal rather than a user error.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>) -> Result<(), DomainError>;
}
