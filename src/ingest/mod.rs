// src/ingest/mod.rs
//! Ingestion coordinator: validate → score on the pool → record → stats.
//!
//! Every item of a batch is validated and, if valid, submitted to the
//! scoring pool straight away, so items score concurrently. Results are then
//! consumed in batch order, which keeps per-user append order equal to the
//! order events appeared in the batch. Any per-item failure is logged and
//! skipped; it never fails the batch.
//!
//! The batch runs as its own task. A caller that stops waiting (client
//! disconnect, timeout) does not stop it: every submitted item is still
//! recorded and the batch still lands in the stats.

pub mod types;

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::dispatch::ScoringDispatcher;
use crate::error::{ScoreError, SkipReason};
use crate::event::RawEvent;
use crate::rolling::RollingWindowStore;
use crate::stats::StatsAggregator;
use self::types::{BatchReport, ItemOutcome};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_requests_total", "Ingest batches received.");
        describe_counter!(
            "ingest_events_processed_total",
            "Events validated, scored and recorded."
        );
        describe_counter!(
            "ingest_events_skipped_total",
            "Events dropped, labelled by reason."
        );
        describe_counter!("median_requests_total", "Median lookups served.");
        describe_histogram!("ingest_batch_seconds", "Wall time per ingest batch.");
    });
}

enum Pending {
    Scoring {
        user_id: String,
        timestamp: i64,
        job: JoinHandle<Result<f64, ScoreError>>,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct IngestCoordinator {
    dispatcher: ScoringDispatcher,
    windows: Arc<RollingWindowStore>,
    stats: Arc<StatsAggregator>,
}

impl IngestCoordinator {
    pub fn new(
        dispatcher: ScoringDispatcher,
        windows: Arc<RollingWindowStore>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            dispatcher,
            windows,
            stats,
        }
    }

    /// Ingest a batch and return how many events were recorded.
    pub async fn ingest(&self, batch: Vec<RawEvent>) -> usize {
        self.ingest_with_report(batch).await.processed
    }

    pub async fn ingest_with_report(&self, batch: Vec<RawEvent>) -> BatchReport {
        let this = self.clone();
        let size = batch.len();
        match tokio::spawn(async move { this.run_batch(batch).await }).await {
            Ok(report) => report,
            Err(e) => {
                error!(target: "ingest", error = %e, size, "ingest batch task failed");
                BatchReport {
                    skipped: size,
                    ..BatchReport::default()
                }
            }
        }
    }

    async fn run_batch(&self, batch: Vec<RawEvent>) -> BatchReport {
        ensure_metrics_described();
        let started = Instant::now();
        self.stats.record_ingest_request();

        let pending: Vec<Pending> = batch.into_iter().map(|raw| self.submit(raw)).collect();

        let mut report = BatchReport::default();
        for p in pending {
            match self.settle(p).await {
                ItemOutcome::Recorded { user_id, score } => {
                    debug!(target: "ingest", user_id = %user_id, score, "event recorded");
                    report.processed += 1;
                }
                ItemOutcome::Skipped(reason) => {
                    debug!(target: "ingest", reason = %reason, "event skipped");
                    counter!("ingest_events_skipped_total", "reason" => reason.label())
                        .increment(1);
                    report.skipped += 1;
                }
            }
        }

        report.elapsed = started.elapsed();
        self.stats.record_events_processed(
            u64::try_from(report.processed).unwrap_or(u64::MAX),
            report.elapsed.as_secs_f64(),
        );
        debug!(
            target: "ingest",
            processed = report.processed,
            skipped = report.skipped,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "batch done"
        );
        report
    }

    fn submit(&self, raw: RawEvent) -> Pending {
        match raw.validate() {
            Ok(ev) => {
                let dispatcher = self.dispatcher.clone();
                let features = ev.features;
                Pending::Scoring {
                    user_id: ev.user_id,
                    timestamp: ev.timestamp,
                    job: tokio::spawn(async move { dispatcher.score(features).await }),
                }
            }
            Err(e) => Pending::Skipped(e.into()),
        }
    }

    async fn settle(&self, p: Pending) -> ItemOutcome {
        let (user_id, timestamp, job) = match p {
            Pending::Skipped(reason) => return ItemOutcome::Skipped(reason),
            Pending::Scoring {
                user_id,
                timestamp,
                job,
            } => (user_id, timestamp, job),
        };

        let scored = job
            .await
            .unwrap_or_else(|e| Err(ScoreError::failed(format!("scoring task aborted: {e}"))));

        match scored {
            Ok(score) => {
                self.windows.record(&user_id, timestamp, score);
                ItemOutcome::Recorded { user_id, score }
            }
            Err(e) => ItemOutcome::Skipped(e.into()),
        }
    }

    pub fn windows(&self) -> &Arc<RollingWindowStore> {
        &self.windows
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    pub fn dispatcher(&self) -> &ScoringDispatcher {
        &self.dispatcher
    }
}
