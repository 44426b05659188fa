//! `alert_matches` persistence.

use super::RepoError;
use acarshub_core::alerts::AlertMatch;
use rusqlite::Connection;

pub fn insert_match(conn: &Connection, uid: &str, time: i64, alert_match: &AlertMatch) -> Result<(), RepoError> {
    conn.execute(
        "INSERT INTO alert_matches (uid, term, time, type_of_match) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![uid, alert_match.term, time, alert_match.field.as_str()],
    )?;
    Ok(())
}

/// Per-term match counts for the metrics endpoint ("per-term match
/// counts", "saved alert total").
pub fn match_counts_by_term(conn: &Connection) -> Result<Vec<(String, i64)>, RepoError> {
    let mut stmt = conn.prepare("SELECT term, COUNT(*) FROM alert_matches GROUP BY term")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<_, _>>()?)
}

pub fn total_match_count(conn: &Connection) -> Result<i64, RepoError> {
    conn.query_row("SELECT COUNT(*) FROM alert_matches", [], |row| row.get(0))
    .map_err(RepoError::from)
}
