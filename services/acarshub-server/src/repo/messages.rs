//! The `messages` table: insert (step 1 of the write path), lookup by
//! uid, and the supplemental `delete_older_than` retention helper.

use super::RepoError;
use acarshub_protocol::EnrichedMessage;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Insert one row, assigning a `uid` if the message doesn't already carry
/// one, and return the assigned uid.
pub fn insert(conn: &Connection, message: &EnrichedMessage) -> Result<String, RepoError> {
    let m = &message.message;
    let uid = m.uid.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    conn.execute(
        "INSERT INTO messages (
        uid, timestamp, message_type, station_id, toaddr, fromaddr, icao,
        tail, flight, depa, dsta, eta, gtout, gtin, wloff, wlin,
        lat, lon, alt, freq, level, ack, mode, label, block_id, msgno,
        is_response, is_onground, error, msg_text, libacars
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
        ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31
    )",
        params![
            uid,
            m.timestamp,
            m.message_type.message_type_str(),
            m.station_id,
            m.toaddr,
            m.fromaddr,
            m.icao,
            m.tail,
            m.flight,
            m.depa,
            m.dsta,
            m.eta,
            m.gtout,
            m.gtin,
            m.wloff,
            m.wlin,
            m.lat,
            m.lon,
            m.alt,
            m.freq,
            m.level,
            m.ack,
            m.mode,
            m.label,
            m.block_id,
            m.msgno,
            m.is_response,
            m.is_onground,
            m.error,
            m.msg_text,
            m.libacars,
        ],
    )?;

    Ok(uid)
}

/// One stored row, used by `get_by_uid` and the search path.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub uid: String,
    pub timestamp: i64,
    pub message_type: String,
    pub station_id: Option<String>,
    pub icao: Option<String>,
    pub tail: Option<String>,
    pub flight: Option<String>,
    pub depa: Option<String>,
    pub dsta: Option<String>,
    pub freq: Option<String>,
    pub level: Option<f64>,
    pub label: Option<String>,
    pub msg_text: Option<String>,
    pub error: i64,
}

pub(crate) fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
            uid: row.get("uid")?,
            timestamp: row.get("timestamp")?,
            message_type: row.get("message_type")?,
            station_id: row.get("station_id")?,
            icao: row.get("icao")?,
            tail: row.get("tail")?,
            flight: row.get("flight")?,
            depa: row.get("depa")?,
            dsta: row.get("dsta")?,
            freq: row.get("freq")?,
            level: row.get("level")?,
            label: row.get("label")?,
            msg_text: row.get("msg_text")?,
            error: row.get("error")?,
    })
}

pub fn get_by_uid(conn: &Connection, uid: &str) -> Result<Option<MessageRow>, RepoError> {
    let mut stmt = conn.prepare("SELECT * FROM messages WHERE uid = ?1")?;
    let mut rows = stmt.query_map([uid], map_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// `deleteOldMessages`. Deletes every row with `timestamp < cutoff_ts`
/// and returns the number of rows removed.
pub fn delete_older_than(conn: &Connection, cutoff_ts: i64) -> Result<u64, RepoError> {
    let deleted = conn.execute("DELETE FROM messages WHERE timestamp < ?1", [cutoff_ts])?;
    Ok(deleted as u64)
}
