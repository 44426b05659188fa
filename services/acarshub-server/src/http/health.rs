//! `GET /health`: reports database reachability alongside row count
//! and file size so an operator can distinguish "up but empty" from
//! "database unreachable".

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
struct DatabaseHealth {
    connected: bool,
    messages: i64,
    size: u64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: DatabaseHealth,
    version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let reader = state.db.reader();
    let db_path = state.db.path().to_owned();
    let row_count = tokio::task::spawn_blocking(move || -> Option<i64> {
            let conn = reader.blocking_lock();
            conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0)).ok()
    })
    .await
    .unwrap_or(None);

    let connected = row_count.is_some();
    let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    Json(HealthResponse {
            status: if connected { "ok" } else { "degraded" },
            database: DatabaseHealth { connected, messages: row_count.unwrap_or(0), size },
            version: VERSION,
    })
}

/// Bare liveness probe: always `200 ok`, independent of database state.
pub async fn healthz() -> impl IntoResponse {
    "ok"
}
