//! Bounded worker pool for scoring calls.
//!
//! A fair `tokio::sync::Semaphore` caps how many scoring jobs run at once;
//! each admitted job runs on the blocking thread pool so CPU-heavy scoring
//! never stalls the async workers. Callers beyond capacity wait in FIFO
//! order. Nothing is ever dropped for being late.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::error::ScoreError;
use crate::scorer::DynScorer;

#[derive(Clone)]
pub struct ScoringDispatcher {
    scorer: Option<DynScorer>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl std::fmt::Debug for ScoringDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringDispatcher")
            .field("scorer_loaded", &self.scorer.is_some())
            .field("workers", &self.workers)
            .field("closed", &self.permits.is_closed())
            .finish()
    }
}

impl ScoringDispatcher {
    /// `workers` is clamped to at least 1.
    pub fn new(scorer: Option<DynScorer>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            scorer,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Score one feature vector on the pool and wait for the result.
    pub async fn score(&self, features: Vec<f64>) -> Result<f64, ScoreError> {
        let Some(scorer) = self.scorer.clone() else {
            return Err(ScoreError::Unavailable);
        };

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ScoreError::PoolClosed)?;

        // The permit moves into the job so the slot stays taken until the
        // scorer returns, even if the awaiting caller goes away.
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            scorer.score(&features)
        });

        match job.await {
            Ok(res) => {
                if let Err(e) = &res {
                    debug!(target: "dispatch", error = %e, "scorer rejected input");
                }
                res
            }
            Err(join_err) => {
                error!(target: "dispatch", error = %join_err, "scoring worker panicked");
                Err(ScoreError::failed(format!("worker panicked: {join_err}")))
            }
        }
    }

    /// Stop admitting work. Jobs still waiting for a worker fail with
    /// [`ScoreError::PoolClosed`]; jobs already running finish normally.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn scorer_loaded(&self) -> bool {
        self.scorer.is_some()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs currently holding a worker slot.
    pub fn in_flight(&self) -> usize {
        self.workers.saturating_sub(self.permits.available_permits())
    }
}
