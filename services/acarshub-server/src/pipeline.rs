//! Wires listener output into the queue: `normalize` → `enrich` → `push`.

use acarshub_core::enrich;
use acarshub_formats::normalize;
use acarshub_listeners::ListenerEvent;
use acarshub_protocol::DecoderType;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::AppState;

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Drain one listener's event channel for as long as it stays open,
/// pushing every normalized+enriched message into the shared queue.
pub async fn run(state: AppState, decoder: DecoderType, mut events: mpsc::Receiver<ListenerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ListenerEvent::Message { decoder, payload } => {
                let ingest_time = now_unix();
                match normalize(&payload, ingest_time) {
                    Some(canonical) => {
                        let enriched = enrich(canonical);
                        state.queue.push(enriched, ingest_time);
                    }
                    None => debug!(?decoder, "dropped recognized-but-excluded message shape"),
                }
            }
            ListenerEvent::Connected { decoder } => debug!(?decoder, "listener connected"),
            ListenerEvent::Disconnected { decoder } => debug!(?decoder, "listener disconnected"),
            ListenerEvent::Error { decoder, message } => warn!(?decoder, message, "listener error"),
        }
    }
    debug!(?decoder, "listener event channel closed");
}
