//! `databaseSearch(params)`. Indexed fields use `MATCH`
//! prefix queries against `messages_fts`; `station_id` isn't indexed, so it
//! falls back to a substring `LIKE`. Every value is escaped so user input
//! containing FTS5 operators or `LIKE` wildcards can't break the query.

use super::RepoError;
use acarshub_protocol::{SearchParams, SortKey};
use rusqlite::{Connection, ToSql};

pub struct SearchResult {
    pub messages: Vec<super::messages::MessageRow>,
    pub total_count: i64,
}

/// Quote a value as an FTS5 phrase and append a prefix `*`, doubling any
/// embedded `"` so it can't terminate the phrase early or inject a second
/// column filter.
fn fts_phrase(value: &str) -> String {
    format!("\"{}\"*", value.replace('"', "\"\""))
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn sort_column(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Time => "m.timestamp",
        SortKey::Tail => "m.tail",
        SortKey::Flight => "m.flight",
    }
}

pub fn search(conn: &Connection, params: &SearchParams) -> Result<SearchResult, RepoError> {
    let mut fts_filters = Vec::new();
    for (column, value) in [
        ("flight", &params.flight),
        ("tail", &params.tail),
        ("icao", &params.icao),
        ("depa", &params.depa),
        ("dsta", &params.dsta),
        ("label", &params.label),
        ("msg_text", &params.text),
        ("freq", &params.freq),
    ] {
        if let Some(value) = value {
            fts_filters.push(format!("{column}:{}", fts_phrase(value)));
        }
    }

    let mut where_clauses = Vec::new();
    let mut bind_values: Vec<Box<dyn ToSql>> = Vec::new();

    if !fts_filters.is_empty() {
        where_clauses.push("m.id IN (SELECT rowid FROM messages_fts WHERE messages_fts MATCH ?)".to_owned());
        bind_values.push(Box::new(fts_filters.join(" AND ")));
    }
    if let Some(station_id) = &params.station_id {
        where_clauses.push("m.station_id LIKE ? ESCAPE '\\'".to_owned());
        bind_values.push(Box::new(format!("%{}%", escape_like(station_id))));
    }
    if let Some(since) = params.since {
        where_clauses.push("m.timestamp >= ?".to_owned());
        bind_values.push(Box::new(since));
    }
    if let Some(until) = params.until {
        where_clauses.push("m.timestamp <= ?".to_owned());
        bind_values.push(Box::new(until));
    }

    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };

    let total_count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM messages m {where_sql}"),
        rusqlite::params_from_iter(bind_values.iter().map(|v| v.as_ref())),
        |row| row.get(0),
    )?;

    let direction = if params.sort_desc { "DESC" } else { "ASC" };
    let order_sql = format!("ORDER BY {} {}", sort_column(params.sort), direction);

    let query = format!(
        "SELECT m.* FROM messages m {where_sql} {order_sql} LIMIT ? OFFSET ?"
    );
    bind_values.push(Box::new(params.limit));
    bind_values.push(Box::new(params.offset));

    let mut stmt = conn.prepare(&query)?;
    let messages = stmt
    .query_map(rusqlite::params_from_iter(bind_values.iter().map(|v| v.as_ref())), super::messages::map_row)?
    .collect::<Result<Vec<_>, _>>()?;

    Ok(SearchResult { messages, total_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::messages;
    use acarshub_protocol::DecoderType;
    use acarshub_test_utils::sample_enriched_message;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../../migrations/0001_legacy_schema.sql")).unwrap();
        conn.execute_batch(include_str!("../../migrations/0002_split_tables_and_alerts.sql")).unwrap();
        conn
    }

    #[test]
    fn flight_prefix_search_finds_matching_message() {
        let conn = open_test_db();
        let msg = sample_enriched_message(DecoderType::Acars);
        messages::insert(&conn, &msg).unwrap();

        let mut params = SearchParams::default();
        params.flight = Some("UAL".to_owned());
        params.limit = 10;
        let result = search(&conn, &params).unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn station_id_substring_search_matches_anywhere_in_the_value() {
        let conn = open_test_db();
        let msg = sample_enriched_message(DecoderType::Acars);
        messages::insert(&conn, &msg).unwrap();

        let mut params = SearchParams::default();
        params.station_id = Some("JFK".to_owned());
        params.limit = 10;
        let result = search(&conn, &params).unwrap();
        assert_eq!(result.total_count, 1);
    }

    #[test]
    fn special_characters_in_search_term_do_not_error() {
        let conn = open_test_db();
        let msg = sample_enriched_message(DecoderType::Acars);
        messages::insert(&conn, &msg).unwrap();

        let mut params = SearchParams::default();
        params.flight = Some("\"; DROP TABLE messages; --".to_owned());
        params.limit = 10;
        let result = search(&conn, &params).unwrap();
        assert_eq!(result.total_count, 0);
    }
}
