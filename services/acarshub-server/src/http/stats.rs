//! `GET /data/stats.json`: last-hour per-decoder totals, summed from
//! `timeseries_stats` rows; falls back to the live queue counters when the
//! writer hasn't produced a row yet (fresh startup).

use crate::http::response::{internal_error, HttpResponse};
use crate::repo::timeseries;
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

const ONE_HOUR_SECS: i64 = 3_600;

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct StatsResponse {
    pub acars: i64,
    pub vdlm2: i64,
    pub hfdl: i64,
    pub imsl: i64,
    pub irdm: i64,
    pub total: i64,
}

pub async fn stats(State(state): State<AppState>) -> HttpResponse {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    let reader = state.db.reader();
    let result = tokio::task::spawn_blocking(move || -> Result<Option<StatsResponse>, crate::repo::RepoError> {
            let conn = reader.blocking_lock();
            let rows = timeseries::query_raw(&conn, now - ONE_HOUR_SECS, now)?;
            if rows.is_empty() {
                return Ok(None);
            }
            let mut response = StatsResponse::default();
            for row in rows {
                response.acars += row.acars_count;
                response.vdlm2 += row.vdlm_count;
                response.hfdl += row.hfdl_count;
                response.imsl += row.imsl_count;
                response.irdm += row.irdm_count;
                response.total += row.total_count;
            }
            Ok(Some(response))
    })
    .await
    .expect("stats query task panicked");

    match result {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => Json(stats_from_queue(&state)).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

fn stats_from_queue(state: &AppState) -> StatsResponse {
    let stats = state.queue.get_stats();
    StatsResponse {
        acars: stats.last_minute[0] as i64,
        vdlm2: stats.last_minute[1] as i64,
        hfdl: stats.last_minute[2] as i64,
        imsl: stats.last_minute[3] as i64,
        irdm: stats.last_minute[4] as i64,
        total: stats.last_minute.iter().sum::<u64>() as i64,
    }
}
