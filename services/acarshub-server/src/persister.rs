//! Queue consumer implementing the write path. Every step after the
//! main row insert is best-effort and independent — a failure there is
//! logged and the message continues, write-error taxonomy.

use crate::repo::{alerts as alerts_repo, counters, freqs, levels, messages};
use crate::state::AppState;
use acarshub_core::queue::QueuedMessage;
use acarshub_protocol::{DecoderType, EnrichedMessage, PushEvent};
use tracing::{error, warn};

pub async fn run(state: AppState) {
    let mut events = state.queue.subscribe();
    loop {
        match events.recv().await {
            Ok(queued) => persist_one(&state, queued).await,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "persister lagged behind the message queue");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn persist_one(state: &AppState, queued: QueuedMessage) {
    let message = queued.message;
    let had_error = message.message.error > 0;
    let rules = state.alert_rules.clone();
    let writer = state.db.writer();

    let message_for_db = message.clone();
    let uid = tokio::task::spawn_blocking(move || -> Option<String> {
            let conn = writer.blocking_lock();
            let uid = match messages::insert(&conn, &message_for_db) {
                Ok(uid) => uid,
                Err(e) => {
                    error!(error = %e, "failed to insert message row, dropping message");
                    let _ = counters::record_dropped_message(&conn, had_error);
                    return None;
                }
            };

            if let Some(freq) = &message_for_db.message.freq {
                if let Err(e) = freqs::upsert_increment(&conn, message_for_db.message.message_type, freq) {
                    warn!(error = %e, "failed to update frequency histogram");
                }
            }
            if let Some(level) = message_for_db.message.level {
                if let Err(e) = levels::upsert_increment(&conn, message_for_db.message.message_type, level) {
                    warn!(error = %e, "failed to update signal-level histogram");
                }
            }
            if let Err(e) = counters::record_saved_message(&conn, had_error) {
                warn!(error = %e, "failed to update cumulative counters");
            }

            for alert_match in rules.evaluate(&message_for_db) {
                if let Err(e) = alerts_repo::insert_match(&conn, &uid, message_for_db.message.timestamp, &alert_match) {
                    warn!(error = %e, "failed to record alert match");
                }
            }

            Some(uid)
    })
    .await
    .expect("persister db task panicked");

    let Some(uid) = uid else { return };

    if let Some(station_id) = &message.message.station_id {
        if state.stations.observe(station_id) {
            state.emit(PushEvent::StationIds(state.stations.snapshot()));
        }
    }

    let mut with_uid = message;
    with_uid.message.uid = Some(uid);
    state.emit(PushEvent::AcarsMsg(Box::new(with_uid)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::state::AppState;
    use acarshub_test_utils::sample_enriched_message;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
    }

    fn test_state() -> (AppState, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        let config = crate::config::Config {
            db_path: file.path().to_owned(),
            rrd_path: None,
            bind_host: "127.0.0.1".to_owned(),
            bind_port: 0,
            log_level: "info".to_owned(),
            heywhatsthat_id: None,
            heywhatsthat_alts_ft: Vec::new(),
            heywhatsthat_save_path: None,
            decoders: std::collections::HashMap::new(),
            alert_terms: vec!["mayday".to_owned()],
            ignore_terms: Vec::new(),
            airlines_path: None,
            ground_stations_path: None,
            labels_path: None,
            queue_capacity: 15,
        };
        (AppState::new(config, db, now()), file)
    }

    #[tokio::test]
    async fn persisting_a_message_inserts_row_and_updates_counters() {
        let (state, _file) = test_state();
        let msg = sample_enriched_message(DecoderType::Acars);
        persist_one(&state, QueuedMessage { message: msg.clone(), pushed_at: now() }).await;

        let conn_handle = state.db.writer();
        let conn = conn_handle.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        let counts = counters::get_saved_counts(&conn).unwrap();
        assert_eq!(counts.good, 1);
    }

    #[tokio::test]
    async fn alert_term_hit_is_recorded_in_alert_matches() {
        let (state, _file) = test_state();
        let mut msg = sample_enriched_message(DecoderType::Acars);
        msg.message.msg_text = Some("MAYDAY MAYDAY".to_owned());
        persist_one(&state, QueuedMessage { message: msg, pushed_at: now() }).await;

        let conn_handle = state.db.writer();
        let conn = conn_handle.lock().await;
        assert_eq!(alerts_repo::total_match_count(&conn).unwrap(), 1);
    }

    #[tokio::test]
    async fn new_station_id_triggers_a_station_ids_broadcast() {
        let (state, _file) = test_state();
        let mut rx = state.push_tx.subscribe();
        let msg = sample_enriched_message(DecoderType::Acars);
        persist_one(&state, QueuedMessage { message: msg, pushed_at: now() }).await;

        let mut saw_station_ids = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PushEvent::StationIds(_)) {
                saw_station_ids = true;
            }
        }
        assert!(saw_station_ids);
    }
}
