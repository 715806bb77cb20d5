// src/telemetry.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "news_dedup=info,dedup=info,ingest=info,delivery=info,aggregator=info,warn";

/// Install the global subscriber. `RUST_LOG` wins over the default filter
/// (`verbose` bumps it to debug); `LOG_FORMAT=json` switches to JSON lines.
/// Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(DEFAULT_FILTER.replace("=info", "=debug"))
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
