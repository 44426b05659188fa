//! Minute-boundary writer: reads the queue's per-minute
//! counters, inserts one row, then resets them — one logical operation so
//! the reset can never observe a partial write.

use crate::db::Database;
use crate::repo::timeseries as repo_timeseries;
use acarshub_core::MessageQueue;
use acarshub_protocol::TimeSeriesRow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{error, warn};

const MINUTE_SECS: i64 = 60;

/// Owns the writer's background task so `main` can cancel it on shutdown.
pub struct TimeSeriesWriter {
    task: JoinHandle<()>,
}

impl TimeSeriesWriter {
    pub fn spawn(db: Arc<Database>, queue: MessageQueue) -> Self {
        let task = tokio::spawn(run(db, queue));
        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

async fn run(db: Arc<Database>, queue: MessageQueue) {
    sleep_until_next_minute().await;
    let mut ticker = tokio::time::interval(Duration::from_secs(MINUTE_SECS as u64));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // The queue's cumulative `error_total` never resets; the writer tracks
    // its own high-water mark to derive each minute's error delta.
    let last_error_total = AtomicU64::new(queue.get_stats().error_total);

    loop {
        ticker.tick().await;
        write_one(&db, &queue, &last_error_total).await;
    }
}

async fn write_one(db: &Database, queue: &MessageQueue, last_error_total: &AtomicU64) {
    let stats = queue.get_stats();
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    let previous_error_total = last_error_total.swap(stats.error_total, Ordering::SeqCst);
    let error_count = stats.error_total.saturating_sub(previous_error_total) as i64;

    let row = TimeSeriesRow {
        timestamp,
        acars_count: stats.last_minute[0] as i64,
        vdlm_count: stats.last_minute[1] as i64,
        hfdl_count: stats.last_minute[2] as i64,
        imsl_count: stats.last_minute[3] as i64,
        irdm_count: stats.last_minute[4] as i64,
        total_count: stats.last_minute.iter().sum::<u64>() as i64,
        error_count,
    };

    let writer = db.writer();
    let insert_result = tokio::task::spawn_blocking(move || {
            let conn = writer.blocking_lock();
            repo_timeseries::insert_row(&conn, &row)
    })
    .await
    .expect("timeseries writer db task panicked");

    match insert_result {
        Ok(()) => queue.reset_minute_stats(),
        Err(e) => {
            // Per the Open Question decision in DESIGN.md: a failed write
            // does not reset the counters, so the next minute's row
            // absorbs the unwritten traffic instead of silently losing it.
            error!(error = %e, "failed to write time-series row, leaving minute counters intact");
        }
    }
}

async fn sleep_until_next_minute() {
    let now_secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    let remainder = now_secs % MINUTE_SECS;
    let wait_secs = if remainder == 0 { MINUTE_SECS } else { MINUTE_SECS - remainder };
    tokio::time::sleep(Duration::from_secs(wait_secs as u64)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use acarshub_protocol::DecoderType;

    fn sample_message(error: i64) -> acarshub_protocol::EnrichedMessage {
        let mut m = acarshub_protocol::CanonicalMessage::new(DecoderType::Acars, 0);
        m.error = error;
        acarshub_protocol::EnrichedMessage {
            message: m,
            icao_hex: None,
            airline: None,
            iata_flight: None,
            icao_flight: None,
            flight_number: None,
            toaddr_hex: None,
            toaddr_decoded: None,
            fromaddr_hex: None,
            fromaddr_decoded: None,
            label_type: "Unknown Message Label".to_owned(),
        }
    }

    #[tokio::test]
    async fn writing_one_row_resets_minute_counters_but_not_totals() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        let queue = MessageQueue::new(15);
        queue.push(sample_message(0), 0);
        queue.push(sample_message(0), 0);

        let last_error_total = AtomicU64::new(0);
        write_one(&db, &queue, &last_error_total).await;

        let stats = queue.get_stats();
        assert_eq!(stats.last_minute[0], 0);
        assert_eq!(stats.total[0], 2);

        let conn = db.writer();
        let conn = conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM timeseries_stats", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn error_count_is_the_delta_since_the_last_write() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        let queue = MessageQueue::new(15);
        queue.push(sample_message(2), 0);

        let last_error_total = AtomicU64::new(0);
        write_one(&db, &queue, &last_error_total).await;

        queue.push(sample_message(1), 0);
        write_one(&db, &queue, &last_error_total).await;

        let conn = db.writer();
        let conn = conn.lock().await;
        let mut stmt = conn.prepare("SELECT error_count FROM timeseries_stats ORDER BY id ASC").unwrap();
        let values: Vec<i64> = stmt.query_map([], |r| r.get(0)).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(values, vec![2, 1]);
    }
}
