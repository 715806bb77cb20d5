//! News Dedup Service: binary entrypoint
//! Loads config, starts the aggregation loop and serves the dedup API over Axum.

use std::time::Duration;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use news_dedup::aggregator::build_from_config;
use news_dedup::api::{self, AppState};
use news_dedup::config::AggregatorConfig;
use news_dedup::metrics::Metrics;
use news_dedup::telemetry;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let verbose = std::env::var("DEDUP_VERBOSE").ok().is_some_and(|v| v == "1");
    telemetry::init_tracing(verbose);

    let cfg = AggregatorConfig::load_default().context("loading aggregator config")?;
    let aggregator = build_from_config(&cfg).context("invalid aggregator config")?;
    let metrics = Metrics::init(cfg.dedupe_window_hours)?;

    tracing::info!(
        target: "aggregator",
        window_hours = cfg.dedupe_window_hours,
        poll_secs = cfg.poll_interval_secs,
        endpoint = %cfg.pulse_endpoint,
        symbols = ?cfg.tracked_symbols,
        providers = ?aggregator.provider_names(),
        "news dedup service starting"
    );

    let state = AppState::new(aggregator.engine());
    news_dedup::aggregator::spawn_scheduler(
        aggregator,
        Duration::from_secs(cfg.poll_interval_secs),
    );

    let router = api::router(state, Some(&metrics));
    Ok(router.into())
}
