// src/delivery/pulse.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use metrics::counter;
use reqwest::Client;
use serde::Serialize;

use super::{format_for_pulse, DeliveryReport, DeliverySink, DeliveryStats, PulseItem};
use crate::article::Article;

/// Posts `{"news": [...]}` to the Pulse endpoint. Endpoints not starting with `http`
/// run in mock mode and only log what would be sent.
pub struct PulseSink {
    endpoint: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    successful: AtomicU64,
    failed: AtomicU64,
}

#[derive(Serialize)]
struct PulsePayload<'a> {
    news: &'a [PulseItem],
}

impl PulseSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_mock(&self) -> bool {
        !self.endpoint.starts_with("http")
    }

    fn record_failure(&self, n: usize) {
        self.failed.fetch_add(n as u64, Ordering::Relaxed);
        counter!("delivery_failed_total").increment(n as u64);
    }

    fn record_success(&self, n: usize) {
        self.successful.fetch_add(n as u64, Ordering::Relaxed);
        counter!("delivery_sent_total").increment(n as u64);
    }

    async fn post_with_retries(&self, items: &[PulseItem]) -> Result<()> {
        let payload = PulsePayload { news: items };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Pulse API returned status {}: {e}", rsp.status()),
                },
                Err(e) => anyhow!("Pulse request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "delivery", attempt, error = %err, "retrying pulse delivery");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait::async_trait]
impl DeliverySink for PulseSink {
    async fn deliver(&self, items: &[Article]) -> Result<DeliveryReport> {
        if items.is_empty() {
            tracing::info!(target: "delivery", "no news items to deliver");
            return Ok(DeliveryReport::default());
        }

        let formatted = format_for_pulse(items);

        if self.is_mock() {
            tracing::info!(target: "delivery", count = formatted.len(), "mock delivery mode");
            for item in formatted.iter().take(3) {
                tracing::info!(target: "delivery", source = %item.source, "  * {}", item.headline);
            }
            if formatted.len() > 3 {
                tracing::info!(target: "delivery", "  ... and {} more", formatted.len() - 3);
            }
            self.record_success(formatted.len());
            return Ok(DeliveryReport {
                sent: formatted.len(),
                mock: true,
            });
        }

        tracing::info!(
            target: "delivery",
            count = formatted.len(),
            endpoint = %self.endpoint,
            "sending articles to pulse"
        );
        match self.post_with_retries(&formatted).await {
            Ok(()) => {
                self.record_success(formatted.len());
                Ok(DeliveryReport {
                    sent: formatted.len(),
                    mock: false,
                })
            }
            Err(e) => {
                tracing::error!(target: "delivery", error = %e, "pulse delivery failed");
                self.record_failure(formatted.len());
                Err(e)
            }
        }
    }

    fn stats(&self) -> DeliveryStats {
        let successful = self.successful.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        DeliveryStats {
            successful,
            failed,
            total_sent: successful + failed,
        }
    }
}
