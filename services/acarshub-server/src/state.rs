//! Shared application state threaded through the HTTP layer and every
//! background task: a `Clone`-able struct of `Arc`s, no interior `&mut self`.

use crate::config::Config;
use crate::db::Database;
use crate::timeseries::cache::TimeSeriesCache;
use acarshub_core::{MessageQueue, StationRegistry};
use acarshub_core::alerts::AlertRules;
use acarshub_log::UiLogger;
use acarshub_protocol::PushEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    pub queue: MessageQueue,
    pub stations: StationRegistry,
    pub alert_rules: Arc<AlertRules>,
    pub timeseries_cache: Arc<TimeSeriesCache>,
    pub push_tx: broadcast::Sender<PushEvent>,
    pub logger: Arc<UiLogger<PushEvent>>,
    pub started_at: i64,
}

const PUSH_CHANNEL_CAPACITY: usize = 4096;

impl AppState {
    pub fn new(config: Config, db: Database, started_at: i64) -> Self {
        let queue = MessageQueue::new(config.queue_capacity);
        let alert_rules = Arc::new(AlertRules::new(config.alert_terms.clone(), config.ignore_terms.clone()));
        let (push_tx, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);
        let logger = Arc::new(UiLogger::with_buffer(
                push_tx.clone(),
                |entry| PushEvent::StationIds(vec![format!("log:{}", entry)]),
                500,
        ));
        AppState {
            config: Arc::new(config),
            db: Arc::new(db),
            queue,
            stations: StationRegistry::new(),
            alert_rules,
            timeseries_cache: Arc::new(TimeSeriesCache::new()),
            push_tx,
            logger,
            started_at,
        }
    }

    pub fn emit(&self, event: PushEvent) {
        let _ = self.push_tx.send(event);
    }
}
