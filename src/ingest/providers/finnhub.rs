// src/ingest/providers/finnhub.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::article::Article;
use crate::ingest::types::ArticleProvider;
use crate::ingest::{normalize_text, now_unix};

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    id: u64,
    headline: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    image: Option<String>,
    source: Option<String>,
    datetime: Option<i64>,
    category: Option<String>,
    related: Option<String>,
}

impl Item {
    fn into_article(self, now: i64) -> Article {
        Article {
            id: self.id,
            headline: normalize_text(self.headline.as_deref().unwrap_or_default()),
            summary: normalize_text(self.summary.as_deref().unwrap_or_default()),
            url: self.url.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            source: self.source.unwrap_or_else(|| "FinHub".to_string()),
            datetime: Some(self.datetime.unwrap_or(now)),
            category: self.category.unwrap_or_else(|| "general".to_string()),
            related: self.related.unwrap_or_default(),
            origin: "finnhub".to_string(),
        }
    }
}

/// Parse a Finnhub `/news` response (JSON array) into articles.
/// Records without `datetime` are stamped with `now`.
pub fn parse_finnhub(json: &str, now: i64) -> Result<Vec<Article>> {
    let t0 = std::time::Instant::now();
    let items: Vec<Item> = serde_json::from_str(json).context("parsing finnhub news json")?;
    let out: Vec<Article> = items.into_iter().map(|it| it.into_article(now)).collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(out.len() as u64);
    Ok(out)
}

pub struct FinnhubProvider {
    mode: Mode,
    category: String,
    /// Highest id seen so far; sent as `minId` for incremental fetches (0 = none yet).
    last_id: AtomicU64,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl FinnhubProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            category: "general".to_string(),
            last_id: AtomicU64::new(0),
        }
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, FINNHUB_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                api_key: api_key.into(),
                client,
            },
            category: "general".to_string(),
            last_id: AtomicU64::new(0),
        }
    }

    /// News category: general, forex, crypto, merger.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn last_id(&self) -> Option<u64> {
        match self.last_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    fn remember_ids(&self, articles: &[Article]) {
        if let Some(max) = articles.iter().map(|a| a.id).max() {
            let prev = self.last_id.fetch_max(max, Ordering::Relaxed);
            if max > prev {
                tracing::debug!(target: "ingest", last_id = max, "finnhub last_id updated");
            }
        }
    }
}

#[async_trait]
impl ArticleProvider for FinnhubProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let out = match &self.mode {
            Mode::Fixture(s) => parse_finnhub(s, now_unix())?,
            Mode::Http {
                base_url,
                api_key,
                client,
            } => {
                let mut params = vec![
                    ("category", self.category.clone()),
                    ("token", api_key.clone()),
                ];
                if let Some(min_id) = self.last_id() {
                    params.push(("minId", min_id.to_string()));
                    tracing::info!(target: "ingest", min_id, "fetching finnhub news incrementally");
                } else {
                    tracing::info!(target: "ingest", category = %self.category, "fetching finnhub news");
                }

                let body = client
                    .get(format!("{base_url}/news"))
                    .query(&params)
                    .send()
                    .await
                    .context("finnhub http get()")?
                    .error_for_status()
                    .context("finnhub non-2xx")?
                    .text()
                    .await
                    .context("finnhub http .text()")?;
                parse_finnhub(&body, now_unix())?
            }
        };
        self.remember_ids(&out);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "Finnhub"
    }
}
