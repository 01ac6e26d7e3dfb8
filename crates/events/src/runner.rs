//! Projection runner utilities.
//!
//! Deterministic replay with cursor tracking and no storage assumptions.

use stockflow_core::DomainError;
use thiserror::Error;

use crate::{EventEnvelope, Projection};

/// Tracks projection progress for a single stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionCursor {
    stream: String,
    last_sequence_number: u64,
}

impl ProjectionCursor {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence_number
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("stream mismatch: expected {expected}, found {found}")]
    StreamMismatch { expected: String, found: String },

    #[error("non-monotonic sequence: last {last}, found {found}")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("event {sequence_number} rejected: {source}")]
    Rejected {
        sequence_number: u64,
        #[source]
        source: DomainError,
    },
}

/// Runs envelopes through a projection and tracks progress.
#[derive(Debug)]
pub struct ProjectionRunner<P>
where
    P: Projection,
{
    projection: P,
    cursor: Option<ProjectionCursor>,
}

impl<P> ProjectionRunner<P>
where
    P: Projection,
{
    pub fn new(projection: P) -> Self {
        Self {
            projection,
            cursor: None,
        }
    }

    /// Create a runner pinned to a specific stream.
    pub fn new_for_stream(stream: impl Into<String>, projection: P) -> Self {
        Self {
            projection,
            cursor: Some(ProjectionCursor {
                stream: stream.into(),
                last_sequence_number: 0,
            }),
        }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn into_projection(self) -> P {
        self.projection
    }

    /// Current cursor for this projection (if any envelopes were applied).
    pub fn cursor(&self) -> Option<&ProjectionCursor> {
        self.cursor.as_ref()
    }

    /// Apply a single envelope, enforcing stream consistency and monotonic sequencing.
    ///
    /// The cursor only advances when the projection accepted the event.
    pub fn apply(&mut self, envelope: &EventEnvelope<P::Ev>) -> Result<(), ProjectionError> {
        let found_seq = envelope.sequence_number();

        if let Some(c) = &self.cursor {
            if c.stream != envelope.stream() {
                return Err(ProjectionError::StreamMismatch {
                    expected: c.stream.clone(),
                    found: envelope.stream().to_string(),
                });
            }
            if found_seq <= c.last_sequence_number {
                return Err(ProjectionError::NonMonotonicSequence {
                    last: c.last_sequence_number,
                    found: found_seq,
                });
            }
        }

        self.projection
            .apply(envelope)
            .map_err(|source| ProjectionError::Rejected {
                sequence_number: found_seq,
                source,
            })?;

        self.cursor
            .get_or_insert_with(|| ProjectionCursor {
                stream: envelope.stream().to_string(),
                last_sequence_number: 0,
            })
            .last_sequence_number = found_seq;
        Ok(())
    }

    /// Apply many envelopes in order.
    pub fn run<'a>(
        &mut self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(), ProjectionError>
    where
        P::Ev: 'a,
    {
        for env in envelopes {
            self.apply(env)?;
        }
        Ok(())
    }

    /// Rebuild a projection from scratch by replaying the full history.
    pub fn rebuild_from_scratch<'a>(
        factory: impl FnOnce() -> P,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(P, Option<ProjectionCursor>), ProjectionError>
    where
        P::Ev: 'a,
    {
        let mut runner = ProjectionRunner::new(factory());
        runner.run(envelopes)?;
        Ok((runner.projection, runner.cursor))
    }
}
