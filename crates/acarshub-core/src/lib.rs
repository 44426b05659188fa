//! Enrichment, queueing, and alerting core for the ACARS aggregation
//! pipeline.
//!
//! This crate has no knowledge of transports or storage; it is the pure,
//! in-memory middle of the pipeline between [`acarshub_formats::normalize`]
//! and a persistence layer.

pub mod alerts;
pub mod enricher;
pub mod lookups;
pub mod queue;
pub mod stations;

pub use enricher::enrich;
pub use queue::{MessageQueue, QueueStats};
pub use stations::StationRegistry;
