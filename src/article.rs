// src/article.rs
//! Normalized news record shared by providers, the dedup engine and delivery.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Provider-side id (Finnhub numeric id, 0 when unknown).
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub headline: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub summary: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub image: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub source: String,
    /// Unix seconds. `None` never falls inside a proximity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<i64>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub category: String,
    /// Comma separated tickers, e.g. "AAPL,MSFT".
    #[serde(default, deserialize_with = "string_or_null")]
    pub related: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub origin: String,
}

impl Article {
    /// Parsed `related` field.
    pub fn symbols(&self) -> BTreeSet<&str> {
        parse_symbols(&self.related)
    }

    /// Absolute distance in seconds; `None` if either side lacks a timestamp.
    pub fn seconds_apart(&self, other: &Article) -> Option<u64> {
        match (self.datetime, other.datetime) {
            (Some(a), Some(b)) => Some(a.abs_diff(b)),
            _ => None,
        }
    }
}

/// Split on comma, trim, drop empties.
pub fn parse_symbols(related: &str) -> BTreeSet<&str> {
    related
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn string_or_null<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
