//! Runs a single fetch -> dedup -> deliver cycle and prints what happened.
//! Set `PULSE_ENDPOINT=mock` to keep delivery local.

use anyhow::Result;

use news_dedup::aggregator::build_from_config;
use news_dedup::config::AggregatorConfig;
use news_dedup::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing(false);

    let cfg = AggregatorConfig::load_default()?;
    let mut aggregator = build_from_config(&cfg)?;

    let summary = aggregator.run_cycle().await;
    aggregator.log_summary();

    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("{}", serde_json::to_string_pretty(&aggregator.dedup_stats())?);
    if let Some(e) = &summary.delivery_error {
        eprintln!("delivery failed: {e}");
    }
    Ok(())
}
