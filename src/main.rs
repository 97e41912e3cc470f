//! Score Window Service — Binary Entrypoint
//! Boots the Axum HTTP server: config, model, shared state, routes.

use score_window_service::{build_app, init_tracing, ServiceConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = ServiceConfig::load_default()?;
    tracing::info!(?cfg, "service config resolved");

    let router = build_app(&cfg)?;
    Ok(router.into())
}
