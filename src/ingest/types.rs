// src/ingest/types.rs
use anyhow::Result;

use crate::article::Article;

/// Upstream feed producing normalized articles (Finnhub, Alpaca, ...).
#[async_trait::async_trait]
pub trait ArticleProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &'static str;
}
