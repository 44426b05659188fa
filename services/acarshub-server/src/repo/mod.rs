//! Plain-SQL repository functions, one file per table family, all taking
//! a `&rusqlite::Connection` and returning a typed `Result`. Every function
//! here is synchronous; callers run it inside `tokio::task::spawn_blocking`.

pub mod alerts;
pub mod counters;
pub mod freqs;
pub mod levels;
pub mod messages;
pub mod search;
pub mod timeseries;

#[derive(Debug)]
pub enum RepoError {
    Sqlite(rusqlite::Error),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::Sqlite(e) => write!(f, "sqlite error: {e}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<rusqlite::Error> for RepoError {
    fn from(e: rusqlite::Error) -> Self {
        RepoError::Sqlite(e)
    }
}
