//! `GET /metrics`: Prometheus scrape text wrapper around
//! [`crate::metrics::render`].

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = crate::metrics::render(&state).await;
    ([("content-type", "text/plain; version=0.0.4")], body)
}
