//! One-shot legacy round-robin archive import: migrates a pre-existing
//! time-series file into `timeseries_stats` the first time the server starts
//! against it. Every failure here is logged and skipped
//! ("Startup importer / snapshot / checkpoint failure: Non-fatal").

use crate::db::Database;
use crate::repo::timeseries;
use acarshub_protocol::TimeSeriesRow;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info, warn};

const RRDTOOL_BIN: &str = "rrdtool";
const BATCH_SIZE: usize = 500;

struct Archive {
    label: &'static str,
    step_secs: i64,
    span_secs: i64,
}

const ARCHIVES: [Archive; 4] = [
    Archive { label: "1min", step_secs: 60, span_secs: 25 * 3_600 },
    Archive { label: "5min", step_secs: 300, span_secs: 30 * 86_400 },
    Archive { label: "1h", step_secs: 3_600, span_secs: 180 * 86_400 },
    Archive { label: "6h", step_secs: 21_600, span_secs: 3 * 365 * 86_400 },
];

fn back_path(rrd_path: &Path) -> PathBuf {
    let mut s = rrd_path.as_os_str().to_owned();
    s.push(".back");
    PathBuf::from(s)
}

fn corrupt_path(rrd_path: &Path) -> PathBuf {
    let mut s = rrd_path.as_os_str().to_owned();
    s.push(".corrupt");
    PathBuf::from(s)
}

async fn table_is_nonempty(db: &Database) -> bool {
    let reader = db.reader();
    tokio::task::spawn_blocking(move || {
            let conn = reader.blocking_lock();
            conn.query_row("SELECT EXISTS(SELECT 1 FROM timeseries_stats LIMIT 1)", [], |r| r.get::<_, i64>(0))
            .unwrap_or(0)
            == 1
    })
    .await
    .unwrap_or(false)
}

/// Runs the import once. Safe to call on every startup — it's a no-op
/// once the `.back` marker exists alongside a non-empty table.
pub async fn run(rrd_path: &Path, db: &Database) {
    let back = back_path(rrd_path);
    if back.exists() && table_is_nonempty(db).await {
        info!("legacy archive already imported, skipping");
        return;
    }
    if !rrd_path.exists() {
        info!("no legacy archive file present, skipping import");
        return;
    }
    match std::fs::metadata(rrd_path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        _ => {
            warn!(path = %rrd_path.display(), "legacy archive file is invalid, renaming to .corrupt");
            if let Err(e) = std::fs::rename(rrd_path, corrupt_path(rrd_path)) {
                error!(error = %e, "failed to rename invalid legacy archive");
            }
            return;
        }
    }

    let mut any_succeeded = false;
    for archive in &ARCHIVES {
        match import_archive(rrd_path, archive, db).await {
            Ok(rows) => {
                info!(archive = archive.label, rows, "imported legacy archive");
                any_succeeded = true;
            }
            Err(e) => warn!(archive = archive.label, error = %e, "failed to import legacy archive, continuing with the next one"),
        }
    }

    if any_succeeded {
        if let Err(e) = std::fs::rename(rrd_path, &back) {
            warn!(error = %e, "failed to rename legacy archive to .back after import");
        }
    }
}

async fn import_archive(rrd_path: &Path, archive: &Archive, db: &Database) -> Result<usize, std::io::Error> {
    let output = Command::new(RRDTOOL_BIN)
    .arg("fetch")
    .arg(rrd_path)
    .arg("AVERAGE")
    .arg("--resolution")
    .arg(archive.step_secs.to_string())
    .arg("--start")
    .arg(format!("-{}", archive.span_secs))
    .output()
    .await?;

    if !output.status.success() {
        return Err(std::io::Error::other(format!(
                    "rrdtool exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let coarse_rows = parse_fetch_output(&text);
    let expanded = expand_rows(&coarse_rows, archive.step_secs);

    let writer = db.writer();
    let row_count = expanded.len();
    tokio::task::spawn_blocking(move || -> Result<(), crate::repo::RepoError> {
            let mut conn = writer.blocking_lock();
            for batch in expanded.chunks(BATCH_SIZE) {
                let tx = conn.transaction()?;
                for row in batch {
                    timeseries::insert_row(&tx, row)?;
                }
                tx.commit()?;
            }
            Ok(())
    })
    .await
    .expect("importer insert task panicked")
    .map_err(|e| std::io::Error::other(e.to_string()))?;

    Ok(row_count)
}

/// Coarse row straight from `rrdtool fetch`'s columns, in source order
/// `{acars, vdlm, total, error, hfdl, imsl, irdm}`.
struct CoarseRow {
    timestamp: i64,
    acars: i64,
    vdlm: i64,
    total: i64,
    error: i64,
    hfdl: i64,
    imsl: i64,
    irdm: i64,
}

fn parse_number(token: &str) -> i64 {
    if token.eq_ignore_ascii_case("nan") {
        return 0;
    }
    token.parse::<f64>().map(|v| v.round() as i64).unwrap_or(0)
}

/// Parses `rrdtool fetch` text output: a header line followed by
/// `timestamp: v1 v2 ... v7` rows.
fn parse_fetch_output(text: &str) -> Vec<CoarseRow> {
    let mut rows = Vec::new();
    for line in text.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((ts_part, rest)) = line.split_once(':') else { continue };
        let Ok(timestamp) = ts_part.trim().parse::<i64>() else { continue };
        let values: Vec<i64> = rest.split_whitespace().map(parse_number).collect();
        if values.len() < 7 {
            continue;
        }
        rows.push(CoarseRow {
                timestamp,
                acars: values[0],
                vdlm: values[1],
                total: values[2],
                error: values[3],
                hfdl: values[4],
                imsl: values[5],
                irdm: values[6],
        });
    }
    rows
}

/// Expands each coarse row into `step_secs / 60` 1-minute rows, all
/// carrying the same counts.
fn expand_rows(coarse: &[CoarseRow], step_secs: i64) -> Vec<TimeSeriesRow> {
    let repeats = (step_secs / 60).max(1);
    let mut out = Vec::with_capacity(coarse.len() * repeats as usize);
    for row in coarse {
        for i in 0..repeats {
            out.push(TimeSeriesRow {
                    timestamp: row.timestamp + i * 60,
                    acars_count: row.acars,
                    vdlm_count: row.vdlm,
                    hfdl_count: row.hfdl,
                    imsl_count: row.imsl,
                    irdm_count: row.irdm,
                    total_count: row.total,
                    error_count: row.error,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_tokens_convert_to_zero_and_values_round_to_integers() {
        assert_eq!(parse_number("nan"), 0);
        assert_eq!(parse_number("NaN"), 0);
        assert_eq!(parse_number("3.7e+00"), 4);
        assert_eq!(parse_number("1.2000000000e+01"), 12);
    }

    #[test]
    fn fetch_output_is_parsed_into_coarse_rows() {
        let text = " acars vdlm total error hfdl imsl irdm\n\n\
        1700000000: 3.0000000000e+00 5.0000000000e+00 8.0000000000e+00 0.0000000000e+00 nan 1.0000000000e+00 2.0000000000e+00\n";
        let rows = parse_fetch_output(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1_700_000_000);
        assert_eq!(rows[0].acars, 3);
        assert_eq!(rows[0].hfdl, 0);
        assert_eq!(rows[0].irdm, 2);
    }

    #[test]
    fn a_five_minute_row_expands_into_five_one_minute_rows() {
        let coarse = vec![CoarseRow {
                timestamp: 1_000,
                acars: 2,
                vdlm: 3,
                total: 5,
                error: 0,
                hfdl: 0,
                imsl: 0,
                irdm: 0,
        }];
        let expanded = expand_rows(&coarse, 300);
        assert_eq!(expanded.len(), 5);
        assert_eq!(expanded.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![1_000, 1_060, 1_120, 1_180, 1_240]);
        assert!(expanded.iter().all(|r| r.total_count == 5));
    }

    #[test]
    fn every_expanded_value_is_non_negative() {
        let coarse = vec![CoarseRow {
                timestamp: 0,
                acars: 0,
                vdlm: 0,
                total: 0,
                error: 0,
                hfdl: 0,
                imsl: 0,
                irdm: 0,
        }];
        let expanded = expand_rows(&coarse, 60);
        assert!(expanded.iter().all(|r| {
                    r.acars_count >= 0
                    && r.vdlm_count >= 0
                    && r.hfdl_count >= 0
                    && r.imsl_count >= 0
                    && r.irdm_count >= 0
                    && r.total_count >= 0
                    && r.error_count >= 0
        }));
    }
}
