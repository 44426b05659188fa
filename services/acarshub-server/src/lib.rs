pub mod config;
pub mod coverage;
pub mod db;
pub mod http;
pub mod importer;
pub mod metrics;
pub mod persister;
pub mod pipeline;
pub mod repo;
pub mod scheduler;
pub mod state;
pub mod timeseries;

pub use http::build_router;
pub use state::AppState;
