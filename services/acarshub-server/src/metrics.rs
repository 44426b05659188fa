//! Prometheus-format scrape text. Every value is
//! resolved at scrape time straight from the database and live state —
//! nothing here is a registered, pre-aggregated counter.

use crate::repo::{alerts, counters, freqs, levels, timeseries};
use crate::state::AppState;
use acarshub_protocol::DecoderType;
use std::fmt::Write as _;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn render(state: &AppState) -> String {
    let db_path = state.db.path().to_owned();
    let reader = state.db.reader();
    let result = tokio::task::spawn_blocking(move || -> Result<String, crate::repo::RepoError> {
            let conn = reader.blocking_lock();
            let row_count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
            let saved = counters::get_saved_counts(&conn)?;
            let dropped = counters::get_dropped_counts(&conn)?;
            let latest_minute = timeseries::latest_row(&conn)?;
            let signal_levels = levels::all_signal_levels(&conn)?;
            let mut frequencies = Vec::with_capacity(5);
            for decoder in DecoderType::ALL {
                frequencies.push((decoder, freqs::all_for_decoder(&conn, decoder)?));
            }
            let per_term_matches = alerts::match_counts_by_term(&conn)?;
            let total_matches = alerts::total_match_count(&conn)?;

            Ok(render_text(
                    &db_path,
                    row_count,
                    saved,
                    dropped,
                    latest_minute,
                    &signal_levels,
                    &frequencies,
                    &per_term_matches,
                    total_matches,
                    state,
            ))
    })
    .await
    .expect("metrics render task panicked");

    result.unwrap_or_else(|e| format!("# error rendering metrics: {e}\n"))
}

#[allow(clippy::too_many_arguments)]
fn render_text(
    db_path: &std::path::Path,
    row_count: i64,
    saved: counters::CumulativeCounts,
    dropped: (i64, i64),
    latest_minute: Option<acarshub_protocol::TimeSeriesRow>,
    signal_levels: &[(DecoderType, Vec<(f64, i64)>)],
    frequencies: &[(DecoderType, Vec<(String, i64)>)],
    per_term_matches: &[(String, i64)],
    total_matches: i64,
    state: &AppState,
) -> String {
    let mut out = String::new();
    let file_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    let _ = writeln!(out, "# HELP acarshub_messages_total Total persisted message rows.");
    let _ = writeln!(out, "# TYPE acarshub_messages_total gauge");
    let _ = writeln!(out, "acarshub_messages_total {row_count}");

    let _ = writeln!(out, "# HELP acarshub_db_file_bytes Size of the database file on disk.");
    let _ = writeln!(out, "# TYPE acarshub_db_file_bytes gauge");
    let _ = writeln!(out, "acarshub_db_file_bytes {file_size}");

    let _ = writeln!(out, "# HELP acarshub_messages_good_total Cumulative messages persisted without an error.");
    let _ = writeln!(out, "# TYPE acarshub_messages_good_total counter");
    let _ = writeln!(out, "acarshub_messages_good_total {}", saved.good);

    let _ = writeln!(out, "# HELP acarshub_messages_error_total Cumulative messages persisted with an error.");
    let _ = writeln!(out, "# TYPE acarshub_messages_error_total counter");
    let _ = writeln!(out, "acarshub_messages_error_total {}", saved.errors);

    let _ = writeln!(out, "# HELP acarshub_messages_dropped_total Cumulative messages that failed to persist.");
    let _ = writeln!(out, "# TYPE acarshub_messages_dropped_total counter");
    let _ = writeln!(out, "acarshub_messages_dropped_total{{error=\"false\"}} {}", dropped.0);
    let _ = writeln!(out, "acarshub_messages_dropped_total{{error=\"true\"}} {}", dropped.1);

    let _ = writeln!(out, "# HELP acarshub_last_minute_messages Per-decoder message count for the most recent 1-minute window.");
    let _ = writeln!(out, "# TYPE acarshub_last_minute_messages gauge");
    if let Some(row) = latest_minute {
        let _ = writeln!(out, "acarshub_last_minute_messages{{decoder=\"ACARS\"}} {}", row.acars_count);
        let _ = writeln!(out, "acarshub_last_minute_messages{{decoder=\"VDLM2\"}} {}", row.vdlm_count);
        let _ = writeln!(out, "acarshub_last_minute_messages{{decoder=\"HFDL\"}} {}", row.hfdl_count);
        let _ = writeln!(out, "acarshub_last_minute_messages{{decoder=\"IMSL\"}} {}", row.imsl_count);
        let _ = writeln!(out, "acarshub_last_minute_messages{{decoder=\"IRDM\"}} {}", row.irdm_count);
    }

    let _ = writeln!(out, "# HELP acarshub_signal_level Count of messages observed at a given signal level.");
    let _ = writeln!(out, "# TYPE acarshub_signal_level gauge");
    for (decoder, levels) in signal_levels {
        for (level, count) in levels {
            let _ = writeln!(
                out,
                "acarshub_signal_level{{decoder=\"{}\",level=\"{level}\"}} {count}",
                decoder.histogram_key()
            );
        }
    }

    let _ = writeln!(out, "# HELP acarshub_frequency Count of messages observed on a given frequency.");
    let _ = writeln!(out, "# TYPE acarshub_frequency gauge");
    for (decoder, freqs) in frequencies {
        for (freq, count) in freqs {
            let _ = writeln!(
                out,
                "acarshub_frequency{{decoder=\"{}\",freq=\"{freq}\"}} {count}",
                decoder.histogram_key()
            );
        }
    }

    let _ = writeln!(out, "# HELP acarshub_alert_terms_configured Number of configured alert terms.");
    let _ = writeln!(out, "# TYPE acarshub_alert_terms_configured gauge");
    let _ = writeln!(out, "acarshub_alert_terms_configured {}", state.config.alert_terms.len());

    let _ = writeln!(out, "# HELP acarshub_alert_matches_total Cumulative alert-term matches, by term.");
    let _ = writeln!(out, "# TYPE acarshub_alert_matches_total counter");
    for (term, count) in per_term_matches {
        let _ = writeln!(out, "acarshub_alert_matches_total{{term=\"{term}\"}} {count}");
    }

    let _ = writeln!(out, "# HELP acarshub_alert_matches_saved_total Cumulative alert-term matches across all terms.");
    let _ = writeln!(out, "# TYPE acarshub_alert_matches_saved_total counter");
    let _ = writeln!(out, "acarshub_alert_matches_saved_total {total_matches}");

    let _ = writeln!(out, "# HELP acarshub_info Build and configuration info.");
    let _ = writeln!(out, "# TYPE acarshub_info gauge");
    let mut labels = format!("version=\"{VERSION}\"");
    for decoder in DecoderType::ALL {
        let enabled = state.config.decoders.get(&decoder).map(|d| d.enabled).unwrap_or(false);
        let _ = write!(labels, ",{}=\"{enabled}\"", decoder.table_suffix());
    }
    let _ = writeln!(out, "acarshub_info{{{labels}}} 1");

    out
}
