// src/lib.rs
// Public library surface for the service binary, the one-shot runner and integration tests.

pub mod article;
pub mod config;
pub mod dedup;

// Provider fetches, delivery and the polling loop around the engine
pub mod aggregator;
pub mod delivery;
pub mod ingest;

pub mod api;
pub mod metrics;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{Aggregator, CycleSummary, RunStats, SharedEngine};
pub use crate::api::router;
pub use crate::article::Article;
pub use crate::config::AggregatorConfig;
pub use crate::dedup::{DedupEngine, DedupStats, Duplicate};
