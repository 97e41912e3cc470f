// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod ingest;
pub mod metrics;
pub mod rolling;
pub mod scorer;
pub mod service;
pub mod stats;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::ServiceConfig;
pub use crate::error::{InvalidEvent, ScoreError, SkipReason};
pub use crate::event::{RawEvent, ScoredSample};
pub use crate::scorer::{load_scorer, DynScorer, MlpScorer, Scorer};
pub use crate::service::ScoreService;
pub use crate::stats::StatsSnapshot;

use axum::Router;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a compact tracing subscriber. Safe to call when another
/// subscriber (e.g. the Shuttle runtime's) is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("score_window_service=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Wire config → scorer → service → router. A missing or broken model does
/// not fail startup.
pub fn build_app(cfg: &ServiceConfig) -> anyhow::Result<Router> {
    let scorer = load_scorer(&cfg.model_path);
    let service = ScoreService::from_config(cfg, scorer);

    let metrics = if cfg.metrics_enabled {
        Some(metrics::Metrics::init(cfg.window_secs, cfg.scorer_workers)?)
    } else {
        None
    };

    info!(
        model = %cfg.model_path.display(),
        metrics = cfg.metrics_enabled,
        "router built"
    );
    Ok(create_router(service, metrics.as_ref()))
}
