// src/aggregator.rs
//! Fetch -> dedup -> deliver cycle and its polling loop.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::article::Article;
use crate::config::AggregatorConfig;
use crate::dedup::{DedupEngine, DedupStats};
use crate::delivery::{DeliverySink, DeliveryStats, PulseSink};
use crate::ingest::providers::{alpaca::AlpacaProvider, finnhub::FinnhubProvider};
use crate::ingest::{self, types::ArticleProvider};

/// Engine shared between the polling loop and the HTTP API.
pub type SharedEngine = Arc<Mutex<DedupEngine>>;

pub fn shared_engine(window_hours: u32) -> SharedEngine {
    Arc::new(Mutex::new(DedupEngine::new(window_hours)))
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregator_runs_total", "Completed aggregation cycles.");
        describe_counter!("delivery_sent_total", "Articles delivered downstream.");
        describe_counter!("delivery_failed_total", "Articles whose delivery failed.");
        describe_gauge!(
            "aggregator_last_run_ts",
            "Unix ts when the aggregation cycle last completed."
        );
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_runs: u64,
    pub total_articles_fetched: u64,
    pub total_unique_articles: u64,
    pub total_delivered: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub fetched: usize,
    pub unique: usize,
    pub delivered: usize,
    /// Per provider, in provider order.
    pub per_provider: Vec<(String, usize)>,
    pub delivery_error: Option<String>,
}

pub struct Aggregator {
    providers: Vec<Box<dyn ArticleProvider>>,
    engine: SharedEngine,
    sink: Box<dyn DeliverySink>,
    stats: RunStats,
}

impl Aggregator {
    pub fn new(
        providers: Vec<Box<dyn ArticleProvider>>,
        engine: SharedEngine,
        sink: Box<dyn DeliverySink>,
    ) -> Self {
        Self {
            providers,
            engine,
            sink,
            stats: RunStats::default(),
        }
    }

    /// Alpaca always (keys optional), Finnhub when a key is configured, Pulse delivery.
    pub fn from_config(cfg: &AggregatorConfig, engine: SharedEngine) -> Self {
        let mut providers: Vec<Box<dyn ArticleProvider>> = vec![Box::new(
            AlpacaProvider::with_base_url(
                cfg.alpaca_api_key.clone(),
                cfg.alpaca_api_secret.clone(),
                cfg.alpaca_base_url.clone(),
            )
            .with_symbols(cfg.tracked_symbols.clone()),
        )];
        if let Some(key) = &cfg.finnhub_api_key {
            providers.push(Box::new(
                FinnhubProvider::with_base_url(key.clone(), cfg.finnhub_base_url.clone())
                    .with_category(cfg.finnhub_category.clone()),
            ));
        }
        let sink = Box::new(PulseSink::new(cfg.pulse_endpoint.clone()));
        Self::new(providers, engine, sink)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    pub fn run_stats(&self) -> RunStats {
        self.stats
    }

    pub fn dedup_stats(&self) -> DedupStats {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.sink.stats()
    }

    /// One fetch -> dedup -> deliver pass. Provider and delivery failures are logged and
    /// reported in the summary, never propagated.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        ensure_metrics_described();
        tracing::info!(target: "aggregator", cycle = self.stats.total_runs + 1, "starting news aggregation cycle");

        let mut fetched_all: Vec<Article> = Vec::new();
        let mut per_provider = Vec::with_capacity(self.providers.len());
        for p in &self.providers {
            let mut got = ingest::run_once(std::slice::from_ref(p)).await;
            per_provider.push((p.name().to_string(), got.len()));
            fetched_all.append(&mut got);
        }
        let fetched = fetched_all.len();
        self.stats.total_articles_fetched += fetched as u64;

        let mut summary = CycleSummary {
            fetched,
            per_provider,
            ..Default::default()
        };

        if fetched_all.is_empty() {
            tracing::info!(target: "aggregator", "no new articles to process");
        } else {
            let mut unique = {
                let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
                engine.process(fetched_all)
            };
            summary.unique = unique.len();
            self.stats.total_unique_articles += unique.len() as u64;

            // Newest first for the consumer.
            unique.sort_by(|a, b| b.datetime.cmp(&a.datetime));

            match self.sink.deliver(&unique).await {
                Ok(report) => {
                    summary.delivered = report.sent;
                    self.stats.total_delivered += report.sent as u64;
                }
                Err(e) => summary.delivery_error = Some(format!("{e:#}")),
            }
        }

        self.stats.total_runs += 1;
        counter!("aggregator_runs_total").increment(1);
        gauge!("aggregator_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        tracing::info!(
            target: "aggregator",
            fetched = summary.fetched,
            unique = summary.unique,
            delivered = summary.delivered,
            dedup = ?self.dedup_stats(),
            "cycle complete"
        );
        summary
    }

    /// Poll every `interval` until `max_duration` (if any) has elapsed.
    pub async fn run_continuous(&mut self, interval: Duration, max_duration: Option<Duration>) {
        tracing::info!(target: "aggregator", interval_secs = interval.as_secs(), "starting continuous aggregation");
        let started = Instant::now();
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.run_cycle().await;

            if let Some(max) = max_duration {
                if started.elapsed() >= max {
                    tracing::info!(target: "aggregator", max_secs = max.as_secs(), "max duration reached, stopping");
                    break;
                }
            }
        }
        self.log_summary();
    }

    pub fn log_summary(&self) {
        tracing::info!(
            target: "aggregator",
            runs = self.stats.total_runs,
            fetched = self.stats.total_articles_fetched,
            unique = self.stats.total_unique_articles,
            delivered = self.stats.total_delivered,
            dedup = ?self.dedup_stats(),
            delivery = ?self.delivery_stats(),
            "news aggregation summary"
        );
    }
}

/// Spawn the polling loop on the current runtime.
pub fn spawn_scheduler(mut aggregator: Aggregator, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        aggregator.run_continuous(interval, None).await;
    })
}

/// Build everything from config: validate, log warnings, share the engine.
pub fn build_from_config(cfg: &AggregatorConfig) -> Result<Aggregator> {
    for w in cfg.validate()? {
        tracing::warn!(target: "aggregator", "configuration warning: {w}");
    }
    let engine = shared_engine(cfg.dedupe_window_hours);
    Ok(Aggregator::from_config(cfg, engine))
}
