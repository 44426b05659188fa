//! HTTP surface: the four external endpoints plus the ambient `/healthz`
//! liveness route, wired as a flat chain of `.route(...)` calls.

pub mod geojson;
pub mod health;
pub mod metrics;
pub mod response;
pub mod stats;

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/healthz", get(health::healthz))
        .route("/data/stats.json", get(stats::stats))
        .route("/data/heywhatsthat.geojson", get(geojson::geojson))
        .route("/metrics", get(metrics::metrics))
        .fallback(fallback_404)
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
