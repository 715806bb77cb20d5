// src/delivery/mod.rs
//! Downstream delivery of deduplicated articles.

pub mod pulse;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::article::Article;

pub use pulse::PulseSink;

/// Wire shape expected by the Pulse news endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PulseItem {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub url: String,
    pub image: String,
    pub source: String,
    pub timestamp: i64,
    pub symbols: Vec<String>,
    pub category: String,
    pub origin: String,
}

impl From<&Article> for PulseItem {
    fn from(a: &Article) -> Self {
        let origin = non_empty_or(&a.origin, "unknown");
        Self {
            id: format!("{}-{}", origin, a.id),
            headline: a.headline.clone(),
            summary: a.summary.clone(),
            url: a.url.clone(),
            image: a.image.clone(),
            source: non_empty_or(&a.source, "Unknown"),
            timestamp: a.datetime.unwrap_or(0),
            symbols: related_in_order(&a.related),
            category: non_empty_or(&a.category, "general"),
            origin,
        }
    }
}

fn non_empty_or(s: &str, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

/// Symbols in their original order (the set form is only for overlap checks).
fn related_in_order(related: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in related.split(',').map(str::trim) {
        if !s.is_empty() && !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    }
    out
}

pub fn format_for_pulse(items: &[Article]) -> Vec<PulseItem> {
    items.iter().map(PulseItem::from).collect()
}

/// Outcome of one delivery call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    /// Nothing left the process (mock endpoint or in-memory sink).
    pub mock: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub successful: u64,
    pub failed: u64,
    pub total_sent: u64,
}

#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver a batch; an empty batch is a successful no-op.
    async fn deliver(&self, items: &[Article]) -> Result<DeliveryReport>;

    fn stats(&self) -> DeliveryStats;
}

#[async_trait::async_trait]
impl<T: DeliverySink + ?Sized> DeliverySink for std::sync::Arc<T> {
    async fn deliver(&self, items: &[Article]) -> Result<DeliveryReport> {
        (**self).deliver(items).await
    }

    fn stats(&self) -> DeliveryStats {
        (**self).stats()
    }
}

/// Collects delivered batches in memory (tests, dry runs).
#[derive(Default)]
pub struct MemorySink {
    pub batches: std::sync::Mutex<Vec<Vec<PulseItem>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Vec<PulseItem>> {
        self.batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl DeliverySink for MemorySink {
    async fn deliver(&self, items: &[Article]) -> Result<DeliveryReport> {
        if items.is_empty() {
            return Ok(DeliveryReport::default());
        }
        self.batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format_for_pulse(items));
        Ok(DeliveryReport {
            sent: items.len(),
            mock: true,
        })
    }

    fn stats(&self) -> DeliveryStats {
        let n: u64 = self
            .delivered()
            .iter()
            .map(|b| b.len() as u64)
            .sum();
        DeliveryStats {
            successful: n,
            failed: 0,
            total_sent: n,
        }
    }
}
