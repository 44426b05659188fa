//! `GET /data/heywhatsthat.geojson`: serves the coverage snapshot
//! written by [`crate::coverage`] verbatim, with long cache headers since
//! the file only changes when `?v=` (the configuration hash) changes.

use crate::http::response::{not_found, HttpResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

const CACHE_CONTROL: &str = "public, max-age=86400";

pub async fn geojson(State(state): State<AppState>) -> HttpResponse {
    let Some(path) = state.config.heywhatsthat_save_path.clone() else {
        return not_found("heywhatsthat coverage is not configured");
    };

    let path_for_read = path.clone();
    let body = tokio::task::spawn_blocking(move || std::fs::read(path_for_read))
    .await
    .expect("geojson read task panicked");

    match body {
        Ok(bytes) => {
            ([(header::CONTENT_TYPE, "application/geo+json"), (header::CACHE_CONTROL, CACHE_CONTROL)], bytes)
            .into_response()
        }
        Err(_) => not_found("heywhatsthat snapshot has not been written yet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use axum::body::to_bytes;
    use std::collections::HashMap;

    fn test_state(save_path: Option<std::path::PathBuf>) -> (AppState, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        let config = Config {
            db_path: file.path().to_owned(),
            rrd_path: None,
            bind_host: "127.0.0.1".to_owned(),
            bind_port: 0,
            log_level: "info".to_owned(),
            heywhatsthat_id: None,
            heywhatsthat_alts_ft: Vec::new(),
            heywhatsthat_save_path: save_path,
            decoders: HashMap::new(),
            alert_terms: Vec::new(),
            ignore_terms: Vec::new(),
            airlines_path: None,
            ground_stations_path: None,
            labels_path: None,
            queue_capacity: 15,
        };
        (AppState::new(config, db, 0), file)
    }

    #[tokio::test]
    async fn unconfigured_coverage_returns_404() {
        let (state, _file) = test_state(None);
        let response = geojson(State(state)).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn existing_snapshot_is_served_verbatim_with_cache_headers() {
        let snapshot = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(snapshot.path(), b"{\"type\":\"FeatureCollection\",\"features\":[]}").unwrap();
        let (state, _file) = test_state(Some(snapshot.path().to_owned()));
        let response = geojson(State(state)).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), CACHE_CONTROL);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\"type\":\"FeatureCollection\",\"features\":[]}");
    }
}
