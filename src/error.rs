//! Per-item failure kinds for the ingest pipeline.
//!
//! None of these ever reach the batch caller; the coordinator maps every
//! variant to "skip, do not count". They exist so logs and metrics can say
//! *why* an item was dropped.

use thiserror::Error;

/// Required event field that was absent (or had the wrong JSON type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid event: missing or malformed `{field}`")]
pub struct InvalidEvent {
    pub field: &'static str,
}

impl InvalidEvent {
    pub fn missing(field: &'static str) -> Self {
        Self { field }
    }
}

/// Failure of a single `score(features)` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// No scorer was loaded at startup.
    #[error("scorer unavailable: no model loaded")]
    Unavailable,
    /// The scorer rejected these inputs or produced a bad value.
    #[error("scoring failed: {0}")]
    Failed(String),
    /// The worker pool was shut down before this job got a worker.
    #[error("scoring pool closed")]
    PoolClosed,
}

impl ScoreError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Stable label used for the `reason` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            ScoreError::Unavailable => "scorer_unavailable",
            ScoreError::Failed(_) => "scoring_failed",
            ScoreError::PoolClosed => "pool_closed",
        }
    }
}

/// Why an item in a batch was not counted as processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Invalid(#[from] InvalidEvent),
    #[error(transparent)]
    Score(#[from] ScoreError),
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::Invalid(_) => "invalid_event",
            SkipReason::Score(e) => e.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(SkipReason::from(InvalidEvent::missing("features")).label(), "invalid_event");
        assert_eq!(SkipReason::from(ScoreError::Unavailable).label(), "scorer_unavailable");
        assert_eq!(SkipReason::from(ScoreError::failed("nan")).label(), "scoring_failed");
        assert_eq!(SkipReason::from(ScoreError::PoolClosed).label(), "pool_closed");
    }

    #[test]
    fn invalid_event_names_the_field() {
        let e = InvalidEvent::missing("user_id");
        assert!(e.to_string().contains("user_id"));
    }
}
