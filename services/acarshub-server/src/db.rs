//! Embedded SQLite storage: PRAGMA/integrity-check discipline on open,
//! an ordered schema-version migration runner, and a small read-only
//! connection pool for the search path.

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

const READ_POOL_SIZE: usize = 4;

const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../migrations/0001_legacy_schema.sql")),
    (2, include_str!("../migrations/0002_split_tables_and_alerts.sql")),
];

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    IntegrityCheckFailed(String),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbError::Sqlite(e) => write!(f, "sqlite error: {e}"),
            DbError::IntegrityCheckFailed(s) => write!(f, "integrity check failed: {s}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::Sqlite(e)
    }
}

pub struct Database {
    path: PathBuf,
    writer: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    next_reader: AtomicUsize,
}

impl Database {
    /// Open (creating if absent), apply durability PRAGMAs, run
    /// `integrity_check`, then run every migration whose version is newer
    /// than the database's current `schema_version`. Fatal on failure —
    /// callers propagate this out of `main` before the server starts.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let writer = Connection::open(path)?;
        apply_writer_pragmas(&writer)?;
        run_integrity_check(&writer)?;
        run_migrations(&writer)?;
        writer.pragma_update(None, "wal_checkpoint", "TRUNCATE")?;

        let mut read_pool = Vec::with_capacity(READ_POOL_SIZE);
        for _ in 0..READ_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_pool.push(Arc::new(Mutex::new(conn)));
        }

        Ok(Database {
                path: path.to_owned(),
                writer: Arc::new(Mutex::new(writer)),
                read_pool,
                next_reader: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn writer(&self) -> Arc<Mutex<Connection>> {
        self.writer.clone()
    }

    /// A read-only connection from the round-robin pool, for the search
    /// path and other queries that never need to see in-flight writes.
    pub fn reader(&self) -> Arc<Mutex<Connection>> {
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[idx].clone()
    }

    /// `checkpoint(mode)`: returns `(frames_checkpointed, frames_remaining)`
    /// where `frames_remaining = log - checkpointed`, never the raw count.
    pub async fn checkpoint(&self, mode: CheckpointMode) -> Result<CheckpointResult, DbError> {
        let writer = self.writer.clone();
        let mode_str = mode.as_str();
        tokio::task::spawn_blocking(move || -> Result<CheckpointResult, DbError> {
                let conn = writer.blocking_lock();
                let (log, checkpointed): (i64, i64) = conn.query_row(
                    &format!("PRAGMA wal_checkpoint({mode_str})"),
                    [],
                    |row| Ok((row.get(1)?, row.get(2)?)),
                )?;
                Ok(CheckpointResult {
                        frames_checkpointed: checkpointed,
                        frames_remaining: log - checkpointed,
                })
        })
        .await
        .expect("checkpoint task panicked")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointMode {
    Passive,
    Full,
    Restart,
    Truncate,
}

impl CheckpointMode {
    fn as_str(&self) -> &'static str {
        match self {
            CheckpointMode::Passive => "PASSIVE",
            CheckpointMode::Full => "FULL",
            CheckpointMode::Restart => "RESTART",
            CheckpointMode::Truncate => "TRUNCATE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointResult {
    pub frames_checkpointed: i64,
    pub frames_remaining: i64,
}

fn apply_writer_pragmas(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

fn run_integrity_check(conn: &Connection) -> Result<(), DbError> {
    let result: String = conn.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
    if result != "ok" {
        return Err(DbError::IntegrityCheckFailed(result));
    }
    Ok(())
}

fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (id INTEGER PRIMARY KEY CHECK (id = 0), version INTEGER NOT NULL);
        INSERT OR IGNORE INTO schema_version (id, version) VALUES (0, 0);",
    )?;
    let current: i64 = conn.query_row("SELECT version FROM schema_version WHERE id = 0", [], |row| row.get(0))?;

    for (version, script) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        info!(version, "applying migration");
        conn.execute_batch(script)?;
        conn.execute("UPDATE schema_version SET version = ?1 WHERE id = 0", [version])?;
    }

    backfill_uids(conn)?;
    Ok(())
}

/// Populate `messages.uid` for any row left over from before the `uid`
/// column existed. SQLite has no UUID generator, so this runs in Rust
/// rather than as part of the 0002 migration script.
fn backfill_uids(conn: &Connection) -> Result<(), DbError> {
    let mut stmt = conn.prepare("SELECT id FROM messages WHERE uid IS NULL")?;
    let ids: Vec<i64> = stmt.query_map([], |row| row.get(0))?.collect::<Result<_, _>>()?;
    drop(stmt);
    if ids.is_empty() {
        return Ok(());
    }
    warn!(count = ids.len(), "backfilling uid for legacy message rows");
    for id in ids {
        let uid = Uuid::new_v4().to_string();
        conn.execute("UPDATE messages SET uid = ?1 WHERE id = ?2", rusqlite::params![uid, id])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_schema_and_is_idempotent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        drop(db);
        let db = Database::open(file.path()).unwrap();
        let conn = db.writer.blocking_lock();
        let version: i64 = conn.query_row("SELECT version FROM schema_version WHERE id = 0", [], |row| row.get(0)).unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn fresh_database_has_no_messages_saved_table_and_has_split_tables() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        let conn = db.writer.blocking_lock();
        let table_exists = |name: &str| -> bool {
            conn.query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .is_ok()
        };
        assert!(!table_exists("messages_saved"));
        for suffix in ["acars", "vdlm", "hfdl", "imsl", "irdm"] {
            assert!(table_exists(&format!("freqs_{suffix}")));
            assert!(table_exists(&format!("level_{suffix}")));
        }
        assert!(table_exists("alert_matches"));
        assert!(table_exists("timeseries_stats"));
    }

    #[tokio::test]
    async fn truncate_checkpoint_on_empty_db_leaves_nothing_remaining() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path()).unwrap();
        let result = db.checkpoint(CheckpointMode::Truncate).await.unwrap();
        assert_eq!(result.frames_remaining, 0);
    }
}
