//! Per-decoder frequency histogram tables.

use super::RepoError;
use acarshub_protocol::DecoderType;
use rusqlite::Connection;

fn table_name(decoder: DecoderType) -> String {
    format!("freqs_{}", decoder.table_suffix())
}

/// Increment `count` for `freq` in the matching per-decoder table, inserting
/// a new row at count 1 if this frequency hasn't been seen before.
pub fn upsert_increment(conn: &Connection, decoder: DecoderType, freq: &str) -> Result<(), RepoError> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (value, count) VALUES (?1, 1)
            ON CONFLICT(value) DO UPDATE SET count = count + 1",
            table = table_name(decoder)
        ),
        [freq],
    )?;
    Ok(())
}

/// `getAllSignalLevels`-adjacent helper for the frequency distribution used
/// by the metrics endpoint: every configured row for one decoder.
pub fn all_for_decoder(conn: &Connection, decoder: DecoderType) -> Result<Vec<(String, i64)>, RepoError> {
    let mut stmt = conn.prepare(&format!("SELECT value, count FROM {}", table_name(decoder)))?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<_, _>>()?)
}
