//! The four logical operations, wired to their state.
//!
//! `ScoreService` owns (via `Arc`) the window store, the stats aggregator and
//! the ingest coordinator. It is built once at startup and cloned into every
//! transport handler; nothing here is global.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ServiceConfig;
use crate::dispatch::ScoringDispatcher;
use crate::event::{RawEvent, ScoredSample};
use crate::ingest::IngestCoordinator;
use crate::rolling::RollingWindowStore;
use crate::scorer::DynScorer;
use crate::stats::{StatsAggregator, StatsSnapshot};

#[derive(Clone, Debug)]
pub struct ScoreService {
    coordinator: IngestCoordinator,
    windows: Arc<RollingWindowStore>,
    stats: Arc<StatsAggregator>,
}

impl ScoreService {
    /// `scorer` is `None` when the model could not be loaded; the service
    /// still runs and every event is skipped as unscorable.
    pub fn new(window: Duration, scorer_workers: usize, scorer: Option<DynScorer>) -> Self {
        let windows = Arc::new(RollingWindowStore::with_window(window));
        let stats = Arc::new(StatsAggregator::new());
        let dispatcher = ScoringDispatcher::new(scorer, scorer_workers);
        info!(
            window_secs = window.as_secs(),
            workers = dispatcher.workers(),
            scorer_loaded = dispatcher.scorer_loaded(),
            "score service ready"
        );
        let coordinator =
            IngestCoordinator::new(dispatcher, Arc::clone(&windows), Arc::clone(&stats));
        Self {
            coordinator,
            windows,
            stats,
        }
    }

    pub fn from_config(cfg: &ServiceConfig, scorer: Option<DynScorer>) -> Self {
        Self::new(
            Duration::from_secs(cfg.window_secs),
            cfg.scorer_workers,
            scorer,
        )
    }

    pub async fn ingest(&self, events: Vec<RawEvent>) -> usize {
        self.coordinator.ingest(events).await
    }

    /// Counts as a median request whether or not the user exists.
    pub fn median(&self, user_id: &str) -> Option<f64> {
        self.stats.record_median_request();
        self.windows.median(user_id)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Diagnostic copy of a user's window; does not touch the counters.
    pub fn window_samples(&self, user_id: &str) -> Option<Vec<ScoredSample>> {
        self.windows.samples(user_id)
    }

    pub fn window_secs(&self) -> u64 {
        self.windows.window_secs()
    }

    /// Close the scoring pool. Queued items are skipped, running ones finish.
    pub fn shutdown(&self) {
        self.coordinator.dispatcher().shutdown();
    }
}
