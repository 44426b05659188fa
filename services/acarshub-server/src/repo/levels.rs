//! Per-decoder signal-level histogram tables. Mirrors `freqs.rs` exactly
//! except the value column is a `REAL`.

use super::RepoError;
use acarshub_protocol::DecoderType;
use rusqlite::Connection;

fn table_name(decoder: DecoderType) -> String {
    format!("level_{}", decoder.table_suffix())
}

pub fn upsert_increment(conn: &Connection, decoder: DecoderType, level: f64) -> Result<(), RepoError> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (value, count) VALUES (?1, 1)
            ON CONFLICT(value) DO UPDATE SET count = count + 1",
            table = table_name(decoder)
        ),
        [level],
    )?;
    Ok(())
}

/// `getAllSignalLevels`: every decoder key must be
/// present in the result even when its table is empty.
pub fn all_signal_levels(conn: &Connection) -> Result<Vec<(DecoderType, Vec<(f64, i64)>)>, RepoError> {
    let mut out = Vec::with_capacity(5);
    for decoder in DecoderType::ALL {
        let mut stmt = conn.prepare(&format!("SELECT value, count FROM {}", table_name(decoder)))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        out.push((decoder, rows.collect::<Result<_, _>>()?));
    }
    Ok(out)
}
