//! `timeseries_stats` persistence. Every row is written at
//! resolution "1min" by the writer; coarser periods downsample these same
//! rows server-side at query time rather than maintaining their own
//! resolution tier.

use super::RepoError;
use acarshub_protocol::TimeSeriesRow;
use rusqlite::{params, Connection};

pub const RESOLUTION_1MIN: &str = "1min";

pub fn insert_row(conn: &Connection, row: &TimeSeriesRow) -> Result<(), RepoError> {
    conn.execute(
        "INSERT INTO timeseries_stats (
        timestamp, resolution, acars_count, vdlm_count, hfdl_count,
        imsl_count, irdm_count, total_count, error_count
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            row.timestamp,
            RESOLUTION_1MIN,
            row.acars_count,
            row.vdlm_count,
            row.hfdl_count,
            row.imsl_count,
            row.irdm_count,
            row.total_count,
            row.error_count,
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeSeriesRow> {
    Ok(TimeSeriesRow {
            timestamp: row.get(0)?,
            acars_count: row.get(1)?,
            vdlm_count: row.get(2)?,
            hfdl_count: row.get(3)?,
            imsl_count: row.get(4)?,
            irdm_count: row.get(5)?,
            total_count: row.get(6)?,
            error_count: row.get(7)?,
    })
}

/// Most recent 1-minute row, for the metrics endpoint's "latest 1-minute
/// per-decoder counts".
pub fn latest_row(conn: &Connection) -> Result<Option<TimeSeriesRow>, RepoError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, acars_count, vdlm_count, hfdl_count, imsl_count, irdm_count, total_count, error_count
        FROM timeseries_stats
        WHERE resolution = ?1
        ORDER BY timestamp DESC
        LIMIT 1",
    )?;
    let mut rows = stmt.query_map([RESOLUTION_1MIN], map_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Raw 1-minute rows in `[since, until]`, for the three periods whose
/// bucket width equals the writer's native resolution (1hr/6hr/12hr).
pub fn query_raw(conn: &Connection, since: i64, until: i64) -> Result<Vec<TimeSeriesRow>, RepoError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, acars_count, vdlm_count, hfdl_count, imsl_count, irdm_count, total_count, error_count
        FROM timeseries_stats
        WHERE resolution = ?1 AND timestamp >= ?2 AND timestamp <= ?3
        ORDER BY timestamp ASC",
    )?;
    let rows = stmt.query_map(params![RESOLUTION_1MIN, since, until], map_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Bucket every 1-minute row in `[since, until]` into `bucket_secs`-wide
/// buckets using `floor(timestamp / bucket_secs) * bucket_secs`, summing
/// each counter column — the server-side downsample for coarser periods.
pub fn query_downsampled(
    conn: &Connection,
    since: i64,
    until: i64,
    bucket_secs: i64,
) -> Result<Vec<TimeSeriesRow>, RepoError> {
    let mut stmt = conn.prepare(
        "SELECT
        (timestamp / ?1) * ?1 AS bucket,
        SUM(acars_count), SUM(vdlm_count), SUM(hfdl_count),
        SUM(imsl_count), SUM(irdm_count), SUM(total_count), SUM(error_count)
        FROM timeseries_stats
        WHERE resolution = ?2 AND timestamp >= ?3 AND timestamp <= ?4
        GROUP BY bucket
        ORDER BY bucket ASC",
    )?;
    let rows = stmt.query_map(params![bucket_secs, RESOLUTION_1MIN, since, until], map_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../../migrations/0001_legacy_schema.sql")).unwrap();
        conn.execute_batch(include_str!("../../migrations/0002_split_tables_and_alerts.sql")).unwrap();
        conn
    }

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
    fn raw_query_returns_rows_in_ascending_timestamp_order() {
        let conn = open_test_db();
        insert_row(&conn, &row(120, 3)).unwrap();
        insert_row(&conn, &row(60, 1)).unwrap();
        let rows = query_raw(&conn, 0, 1_000).unwrap();
        assert_eq!(rows.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![60, 120]);
    }

    #[test]
    fn downsample_sums_counters_within_the_same_bucket() {
        let conn = open_test_db();
        insert_row(&conn, &row(0, 2)).unwrap();
        insert_row(&conn, &row(60, 3)).unwrap();
        insert_row(&conn, &row(300, 5)).unwrap();
        let rows = query_downsampled(&conn, 0, 600, 300).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_count, 5);
        assert_eq!(rows[1].total_count, 5);
    }

    #[test]
    fn latest_row_returns_the_newest_timestamp() {
        let conn = open_test_db();
        assert!(latest_row(&conn).unwrap().is_none());
        insert_row(&conn, &row(60, 1)).unwrap();
        insert_row(&conn, &row(180, 2)).unwrap();
        assert_eq!(latest_row(&conn).unwrap().unwrap().timestamp, 180);
    }
}
