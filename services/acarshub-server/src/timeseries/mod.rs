//! Time-series writer and cache: a minute-boundary writer that
//! turns queue counters into `timeseries_stats` rows, and an 8-window
//! cache that downsamples those rows at wall-clock-aligned intervals.

pub mod cache;
pub mod writer;

use crate::db::Database;
use crate::repo::timeseries as repo_timeseries;
use acarshub_protocol::{TimeSeriesPeriod, TimeSeriesPoint, TimeSeriesRow, TimeSeriesSnapshot};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

/// Build one period's snapshot from the database: raw 1-minute rows for
/// the three finest periods, a server-side bucket-and-sum downsample for
/// everything coarser, zero-filled so every bucket in the window exists.
async fn build_snapshot(
    db: &Database,
    period: TimeSeriesPeriod,
    now_ms: i64,
) -> Result<TimeSeriesSnapshot, crate::repo::RepoError> {
    let bucket_secs = period.bucket_secs();
    let end_secs = (now_ms / 1000 / bucket_secs) * bucket_secs;
    let start_secs = end_secs - period.span_secs();

    let reader = db.reader();
    let rows = tokio::task::spawn_blocking({
            let start_secs = start_secs;
            let end_secs = end_secs;
            move || -> Result<Vec<TimeSeriesRow>, crate::repo::RepoError> {
                let conn = reader.blocking_lock();
                if bucket_secs == 60 {
                    repo_timeseries::query_raw(&conn, start_secs, end_secs)
                } else {
                    repo_timeseries::query_downsampled(&conn, start_secs, end_secs, bucket_secs)
                }
            }
    })
    .await
    .expect("timeseries query task panicked")?;

    Ok(zero_fill(period, start_secs, end_secs, bucket_secs, rows))
}

fn zero_fill(
    period: TimeSeriesPeriod,
    start_secs: i64,
    end_secs: i64,
    bucket_secs: i64,
    rows: Vec<TimeSeriesRow>,
) -> TimeSeriesSnapshot {
    let mut data = Vec::new();
    let mut t = start_secs;
    let mut rows = rows.into_iter().peekable();
    while t <= end_secs {
        let point = match rows.peek() {
            Some(row) if row.timestamp == t => {
                let row = rows.next().unwrap();
                TimeSeriesPoint {
                    timestamp_ms: t * 1000,
                    acars_count: row.acars_count,
                    vdlm_count: row.vdlm_count,
                    hfdl_count: row.hfdl_count,
                    imsl_count: row.imsl_count,
                    irdm_count: row.irdm_count,
                    total_count: row.total_count,
                    error_count: row.error_count,
                }
            }
            _ => TimeSeriesPoint {
                timestamp_ms: t * 1000,
                acars_count: 0,
                vdlm_count: 0,
                hfdl_count: 0,
                imsl_count: 0,
                irdm_count: 0,
                total_count: 0,
                error_count: 0,
            },
        };
        data.push(point);
        t += bucket_secs;
    }

    TimeSeriesSnapshot {
        time_period: period,
        start_ms: start_secs * 1000,
        end_ms: end_secs * 1000,
        points: data.len(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acarshub_protocol::TimeSeriesRow;

    fn row(ts: i64, total: i64) -> TimeSeriesRow {
        TimeSeriesRow {
            timestamp: ts,
            acars_count: total,
            vdlm_count: 0,
            hfdl_count: 0,
            imsl_count: 0,
            irdm_count: 0,
            total_count: total,
            error_count: 0,
        }
    }

    #[test]
    fn zero_fill_inserts_a_zero_point_for_every_missing_bucket() {
        let snapshot = zero_fill(TimeSeriesPeriod::OneHour, 0, 180, 60, vec![row(0, 5), row(180, 2)]);
        assert_eq!(snapshot.points, 4);
        assert_eq!(snapshot.data[1].total_count, 0);
        assert_eq!(snapshot.data[2].total_count, 0);
        assert_eq!(snapshot.data[3].total_count, 2);
    }
}
