use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::event::{RawEvent, ScoredSample};
use crate::metrics::Metrics;
use crate::service::ScoreService;
use crate::stats::StatsSnapshot;

/// Build the HTTP surface. `/metrics` is mounted only when `metrics` is set.
pub fn create_router(service: ScoreService, metrics: Option<&Metrics>) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/ingest", post(ingest))
        .route("/users/{user_id}/median", get(user_median))
        .route("/stats", get(stats))
        .route("/debug/users/{user_id}/window", get(debug_window));

    if let Some(m) = metrics {
        router = router.merge(m.router::<ScoreService>());
    }

    router.layer(CorsLayer::very_permissive()).with_state(service)
}

#[derive(serde::Serialize)]
struct IngestResp {
    processed: usize,
}

#[derive(serde::Serialize)]
struct MedianResp {
    median: Option<f64>,
}

#[derive(serde::Serialize)]
struct WindowResp {
    user_id: String,
    window_secs: u64,
    samples: Option<Vec<ScoredSample>>,
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Score window service is running" }))
}

/// Body: `{"events": [...]}`. Individual malformed events are skipped; only a
/// missing or non-list `events` rejects the request.
async fn ingest(State(svc): State<ScoreService>, Json(body): Json<Value>) -> Response {
    let events = match body.get("events") {
        None | Some(Value::Null) => return bad_request("Missing 'events' in request body"),
        Some(Value::Array(items)) => items.iter().map(RawEvent::from_json).collect::<Vec<_>>(),
        Some(_) => return bad_request("'events' must be a list"),
    };

    let processed = svc.ingest(events).await;
    Json(IngestResp { processed }).into_response()
}

async fn user_median(
    State(svc): State<ScoreService>,
    Path(user_id): Path<String>,
) -> Json<MedianResp> {
    Json(MedianResp {
        median: svc.median(&user_id),
    })
}

async fn stats(State(svc): State<ScoreService>) -> Json<StatsSnapshot> {
    Json(svc.snapshot())
}

async fn debug_window(
    State(svc): State<ScoreService>,
    Path(user_id): Path<String>,
) -> Json<WindowResp> {
    Json(WindowResp {
        samples: svc.window_samples(&user_id),
        window_secs: svc.window_secs(),
        user_id,
    })
}
