// src/ingest/types.rs
use std::time::Duration;

use crate::error::SkipReason;

/// What happened to one item of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Recorded { user_id: String, score: f64 },
    Skipped(SkipReason),
}

/// Per-batch totals; the transport only exposes `processed`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}
