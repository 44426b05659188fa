//! The precomputed, atomically-replaced response cache.

use super::{build_snapshot, now_ms};
use crate::db::Database;
use acarshub_protocol::{TimeSeriesPeriod, TimeSeriesSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Broadcast intervals a period can belong to.
const REFRESH_INTERVALS_SECS: [i64; 5] = [60, 300, 1_800, 3_600, 21_600];

pub struct TimeSeriesCache {
    snapshots: RwLock<HashMap<TimeSeriesPeriod, Arc<TimeSeriesSnapshot>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl TimeSeriesCache {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Returns the current snapshot by reference, or `None` before the
    /// first warm — never queries the database.
    pub fn get_cached(&self, period: TimeSeriesPeriod) -> Option<Arc<TimeSeriesSnapshot>> {
        self.snapshots.read().unwrap().get(&period).cloned()
    }

    /// Warms every period synchronously (no broadcaster calls), then arms
    /// one refresh task per distinct refresh interval. Idempotent: a
    /// second call while already started is a no-op.
    pub async fn init<F>(self: Arc<Self>, db: Arc<Database>, broadcaster: F)
    where
    F: Fn(TimeSeriesPeriod, Arc<TimeSeriesSnapshot>) + Send + Sync + 'static,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        self.warm(&db).await;

        let broadcaster: Arc<dyn Fn(TimeSeriesPeriod, Arc<TimeSeriesSnapshot>) + Send + Sync> = Arc::new(broadcaster);
        let mut tasks = Vec::new();
        for interval_secs in REFRESH_INTERVALS_SECS {
            let periods: Vec<TimeSeriesPeriod> = TimeSeriesPeriod::ALL
            .into_iter()
            .filter(|p| p.refresh_interval_secs() == interval_secs)
            .collect();
            if periods.is_empty() {
                continue;
            }
            let cache = self.clone();
            let db = db.clone();
            let broadcaster = broadcaster.clone();
            tasks.push(tokio::spawn(async move {
                        cache.refresh_loop(db, periods, interval_secs, broadcaster).await;
            }));
        }
        *self.tasks.lock().unwrap() = tasks;
    }

    /// Cancels every refresh task. Idempotent.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }

    async fn warm(&self, db: &Database) {
        let now = now_ms();
        for period in TimeSeriesPeriod::ALL {
            match build_snapshot(db, period, now).await {
                Ok(snapshot) => {
                    self.snapshots.write().unwrap().insert(period, Arc::new(snapshot));
                }
                Err(e) => warn!(?period, error = %e, "initial time-series warm failed for period"),
            }
        }
    }

    async fn refresh_loop(
        self: Arc<Self>,
        db: Arc<Database>,
        periods: Vec<TimeSeriesPeriod>,
        interval_secs: i64,
        broadcaster: Arc<dyn Fn(TimeSeriesPeriod, Arc<TimeSeriesSnapshot>) + Send + Sync>,
    ) {
        sleep_until_next_boundary(interval_secs).await;
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs as u64));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            for period in &periods {
                match build_snapshot(&db, *period, now_ms()).await {
                    Ok(snapshot) => {
                        let snapshot = Arc::new(snapshot);
                        self.snapshots.write().unwrap().insert(*period, snapshot.clone());
                        broadcaster(*period, snapshot);
                    }
                    Err(e) => warn!(?period, error = %e, "time-series refresh failed for period"),
                }
            }
        }
    }
}

impl Default for TimeSeriesCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep until the next wall-clock boundary that is a multiple of
/// `interval_secs`, so the first refresh lands on the grid and every
/// later tick (driven by `tokio::time::interval`) stays aligned to it.
async fn sleep_until_next_boundary(interval_secs: i64) {
    let now_secs = std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs() as i64;
    let remainder = now_secs % interval_secs;
    let wait_secs = if remainder == 0 { interval_secs } else { interval_secs - remainder };
    tokio::time::sleep(Duration::from_secs(wait_secs as u64)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn get_cached_is_none_before_the_first_warm() {
        let cache = TimeSeriesCache::new();
        assert!(cache.get_cached(TimeSeriesPeriod::OneHour).is_none());
    }

    #[tokio::test]
    async fn warm_populates_every_canonical_period() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Arc::new(Database::open(file.path()).unwrap());
        let cache = Arc::new(TimeSeriesCache::new());
        cache.warm(&db).await;
        for period in TimeSeriesPeriod::ALL {
            assert!(cache.get_cached(period).is_some());
        }
    }

    #[tokio::test]
    async fn init_is_idempotent_and_stop_cancels_tasks() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Arc::new(Database::open(file.path()).unwrap());
        let cache = Arc::new(TimeSeriesCache::new());
        cache.clone().init(db.clone(), |_, _| {}).await;
        cache.clone().init(db.clone(), |_, _| {}).await;
        assert_eq!(cache.tasks.lock().unwrap().len(), REFRESH_INTERVALS_SECS.len());
        cache.stop();
        assert!(cache.tasks.lock().unwrap().is_empty());
    }
}
