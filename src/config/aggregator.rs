// src/config/aggregator.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dedup::DEFAULT_WINDOW_HOURS;
use crate::ingest::providers::{alpaca::ALPACA_BASE_URL, finnhub::FINNHUB_BASE_URL};

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/aggregator.toml";
pub const DEFAULT_JSON_PATH: &str = "config/aggregator.json";

const DEFAULT_PULSE_ENDPOINT: &str = "http://localhost:5000/api/news";
const DEFAULT_SYMBOLS: &str = "AAPL,TSLA,NVDA,GOOGL,MSFT,AMZN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub finnhub_api_key: Option<String>,
    pub finnhub_base_url: String,
    /// general | forex | crypto | merger
    pub finnhub_category: String,
    pub alpaca_api_key: Option<String>,
    pub alpaca_api_secret: Option<String>,
    pub alpaca_base_url: String,
    pub poll_interval_secs: u64,
    pub dedupe_window_hours: u32,
    /// `http(s)://...` posts to Pulse; anything else (e.g. "mock") only logs.
    pub pulse_endpoint: String,
    pub tracked_symbols: Vec<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            finnhub_base_url: FINNHUB_BASE_URL.to_string(),
            finnhub_category: "general".to_string(),
            alpaca_api_key: None,
            alpaca_api_secret: None,
            alpaca_base_url: ALPACA_BASE_URL.to_string(),
            poll_interval_secs: 60,
            dedupe_window_hours: DEFAULT_WINDOW_HOURS,
            pulse_endpoint: DEFAULT_PULSE_ENDPOINT.to_string(),
            tracked_symbols: parse_symbol_list(DEFAULT_SYMBOLS),
        }
    }
}

impl AggregatorConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg: Self = match ext.as_str() {
            "json" => serde_json::from_str(&content).context("parsing aggregator json")?,
            _ => toml::from_str(&content).context("parsing aggregator toml")?,
        };
        cfg.sanitize();
        Ok(cfg)
    }

    /// File (if any) + environment overrides:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) config/aggregator.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = match config_path()? {
            Some(p) => Self::load_from(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Apply env-style overrides through `lookup` (real env in production, a map in tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("FINNHUB_API_KEY") {
            self.finnhub_api_key = Some(v);
        }
        if let Some(v) = get("FINNHUB_CATEGORY") {
            self.finnhub_category = v;
        }
        if let Some(v) = get("ALPACA_API_KEY") {
            self.alpaca_api_key = Some(v);
        }
        if let Some(v) = get("ALPACA_API_SECRET") {
            self.alpaca_api_secret = Some(v);
        }
        if let Some(v) = get("POLL_INTERVAL_SECONDS") {
            self.poll_interval_secs = v
                .parse()
                .with_context(|| format!("POLL_INTERVAL_SECONDS must be an integer, got {v:?}"))?;
        }
        if let Some(v) = get("DEDUPE_WINDOW_HOURS") {
            self.dedupe_window_hours = v
                .parse()
                .with_context(|| format!("DEDUPE_WINDOW_HOURS must be an integer, got {v:?}"))?;
        }
        if let Some(v) = get("PULSE_ENDPOINT") {
            self.pulse_endpoint = v;
        }
        if let Some(v) = get("TRACKED_SYMBOLS") {
            self.tracked_symbols = parse_symbol_list(&v);
        }
        self.sanitize();
        Ok(())
    }

    /// Hard errors fail; soft problems come back as warnings for the caller to log.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        if !is_configured(self.finnhub_api_key.as_deref()) {
            errors.push("FINNHUB_API_KEY is not configured");
        }
        if self.dedupe_window_hours == 0 {
            errors.push("DEDUPE_WINDOW_HOURS must be positive");
        }
        if self.poll_interval_secs == 0 {
            errors.push("POLL_INTERVAL_SECONDS must be positive");
        }
        if !errors.is_empty() {
            bail!("configuration errors: {}", errors.join(", "));
        }

        let mut warnings = Vec::new();
        if !is_configured(self.alpaca_api_key.as_deref())
            || !is_configured(self.alpaca_api_secret.as_deref())
        {
            warnings.push(
                "ALPACA_API_KEY/ALPACA_API_SECRET not configured (optional for crypto data)"
                    .to_string(),
            );
        }
        if self.tracked_symbols.is_empty() {
            warnings.push("TRACKED_SYMBOLS is empty; fetching all news".to_string());
        }
        Ok(warnings)
    }

    fn sanitize(&mut self) {
        self.tracked_symbols = clean_list(std::mem::take(&mut self.tracked_symbols));
        for key in [
            &mut self.finnhub_api_key,
            &mut self.alpaca_api_key,
            &mut self.alpaca_api_secret,
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *key = None;
            }
        }
    }
}

fn config_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for p in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
    }
    Ok(None)
}

/// Placeholder values from `.env.example` count as missing.
fn is_configured(v: Option<&str>) -> bool {
    match v {
        Some(k) => {
            let k = k.trim();
            !k.is_empty() && !(k.starts_with("your_") && k.ends_with("_here"))
        }
        None => false,
    }
}

/// "AAPL, TSLA,," -> ["AAPL", "TSLA"]
pub fn parse_symbol_list(s: &str) -> Vec<String> {
    clean_list(s.split(',').map(str::to_string).collect())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
