// src/ingest/providers/alpaca.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::article::Article;
use crate::ingest::types::ArticleProvider;
use crate::ingest::{normalize_text, now_unix};

pub const ALPACA_BASE_URL: &str = "https://data.alpaca.markets/v1beta1";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Response {
    Wrapped { news: Vec<Item> },
    Bare(Vec<Item>),
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    id: u64,
    headline: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    #[serde(default)]
    images: Vec<Image>,
    source: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(default)]
    symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

impl Item {
    fn into_article(self, now: i64) -> Article {
        let ts = self
            .created_at
            .as_deref()
            .and_then(parse_rfc3339_to_unix)
            .or_else(|| self.updated_at.as_deref().and_then(parse_rfc3339_to_unix))
            .unwrap_or(now);
        Article {
            id: self.id,
            headline: normalize_text(self.headline.as_deref().unwrap_or_default()),
            summary: normalize_text(self.summary.as_deref().unwrap_or_default()),
            url: self.url.unwrap_or_default(),
            image: self
                .images
                .into_iter()
                .next()
                .and_then(|i| i.url)
                .unwrap_or_default(),
            source: self.source.unwrap_or_else(|| "Alpaca".to_string()),
            datetime: Some(ts),
            category: "company".to_string(),
            related: self.symbols.join(","),
            origin: "alpaca".to_string(),
        }
    }
}

/// Parse an Alpaca `/news` response (`{"news": [...]}` or a bare array).
/// Unparseable timestamps fall back to `now`.
pub fn parse_alpaca(json: &str, now: i64) -> Result<Vec<Article>> {
    let t0 = std::time::Instant::now();
    let resp: Response = serde_json::from_str(json).context("parsing alpaca news json")?;
    let items = match resp {
        Response::Wrapped { news } => news,
        Response::Bare(v) => v,
    };
    let out: Vec<Article> = items.into_iter().map(|it| it.into_article(now)).collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(out.len() as u64);
    Ok(out)
}

pub struct AlpacaProvider {
    mode: Mode,
    symbols: Vec<String>,
    hours_back: i64,
    limit: u32,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        credentials: Option<(String, String)>,
        client: reqwest::Client,
    },
}

impl AlpacaProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            symbols: Vec::new(),
            hours_back: 1,
            limit: 50,
        }
    }

    /// Keys are optional (crypto news works without them).
    pub fn new(api_key: Option<String>, api_secret: Option<String>) -> Self {
        Self::with_base_url(api_key, api_secret, ALPACA_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        api_secret: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                credentials: api_key.zip(api_secret),
                client,
            },
            symbols: Vec::new(),
            hours_back: 1,
            limit: 50,
        }
    }

    /// Restrict to these tickers (empty = all news).
    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_window(mut self, hours_back: i64, limit: u32) -> Self {
        self.hours_back = hours_back.max(1);
        self.limit = limit.max(1);
        self
    }
}

#[async_trait]
impl ArticleProvider for AlpacaProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => parse_alpaca(s, now_unix()),
            Mode::Http {
                base_url,
                credentials,
                client,
            } => {
                let end = Utc::now();
                let start = end - chrono::Duration::hours(self.hours_back);
                let mut params = vec![
                    ("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    ("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    ("limit", self.limit.to_string()),
                    ("sort", "desc".to_string()),
                ];
                if !self.symbols.is_empty() {
                    params.push(("symbols", self.symbols.join(",")));
                }
                tracing::info!(
                    target: "ingest",
                    symbols = ?self.symbols,
                    hours_back = self.hours_back,
                    "fetching alpaca news"
                );

                let mut req = client.get(format!("{base_url}/news")).query(&params);
                if let Some((key, secret)) = credentials {
                    req = req
                        .header("APCA-API-KEY-ID", key)
                        .header("APCA-API-SECRET-KEY", secret);
                }
                let body = req
                    .send()
                    .await
                    .context("alpaca http get()")?
                    .error_for_status()
                    .context("alpaca non-2xx")?
                    .text()
                    .await
                    .context("alpaca http .text()")?;
                parse_alpaca(&body, now_unix())
            }
        }
    }

    fn name(&self) -> &'static str {
        "Alpaca"
    }
}
