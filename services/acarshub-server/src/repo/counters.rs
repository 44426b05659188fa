//! Cumulative message counters: the `messages_count` singleton survives the legacy-schema
//! migration unchanged, unlike `messages_saved` which the migration drops.

use super::RepoError;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CumulativeCounts {
    pub total: i64,
    pub good: i64,
    pub errors: i64,
}

/// Increment `total`, then either `good` or `errors` depending on whether
/// the persisted message had a positive `error` field.
pub fn record_saved_message(conn: &Connection, had_error: bool) -> Result<(), RepoError> {
    if had_error {
        conn.execute(
            "UPDATE messages_count SET total = total + 1, errors = errors + 1 WHERE id = 0",
            [],
        )?;
    } else {
        conn.execute(
            "UPDATE messages_count SET total = total + 1, good = good + 1 WHERE id = 0",
            [],
        )?;
    }
    Ok(())
}

pub fn get_saved_counts(conn: &Connection) -> Result<CumulativeCounts, RepoError> {
    conn.query_row(
        "SELECT total, good, errors FROM messages_count WHERE id = 0",
        [],
        |row| {
            Ok(CumulativeCounts {
                    total: row.get(0)?,
                    good: row.get(1)?,
                    errors: row.get(2)?,
            })
        },
    )
    .map_err(RepoError::from)
}

/// A write-path failure on the main `messages` row lands here instead of
/// `messages_count`.
pub fn record_dropped_message(conn: &Connection, had_error: bool) -> Result<(), RepoError> {
    if had_error {
        conn.execute(
            "UPDATE messages_count_dropped SET nonlogged_errors = nonlogged_errors + 1 WHERE id = 0",
            [],
        )?;
    } else {
        conn.execute(
            "UPDATE messages_count_dropped SET nonlogged_good = nonlogged_good + 1 WHERE id = 0",
            [],
        )?;
    }
    Ok(())
}

pub fn get_dropped_counts(conn: &Connection) -> Result<(i64, i64), RepoError> {
    conn.query_row(
        "SELECT nonlogged_good, nonlogged_errors FROM messages_count_dropped WHERE id = 0",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(RepoError::from)
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

    #[test]
    fn good_and_error_messages_accumulate_into_distinct_columns() {
        let conn = open_test_db();
        record_saved_message(&conn, false).unwrap();
        record_saved_message(&conn, false).unwrap();
        record_saved_message(&conn, true).unwrap();

        let counts = get_saved_counts(&conn).unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.good, 2);
        assert_eq!(counts.errors, 1);
    }

    #[test]
    fn dropped_messages_do_not_affect_the_saved_counter() {
        let conn = open_test_db();
        record_dropped_message(&conn, false).unwrap();
        assert_eq!(get_saved_counts(&conn).unwrap(), CumulativeCounts::default());
        assert_eq!(get_dropped_counts(&conn).unwrap(), (1, 0));
    }
}
