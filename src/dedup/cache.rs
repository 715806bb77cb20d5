// src/dedup/cache.rs
//! Sliding window of accepted articles plus the URL set derived from it.
//!
//! `prune` and `accept` are the only mutation paths, so `seen_urls` always equals the
//! set of urls in `retained`.

use std::collections::HashSet;

use crate::article::Article;

#[derive(Debug, Clone)]
pub struct ArticleCache {
    window_hours: u32,
    retained: Vec<Article>,
    seen_urls: HashSet<String>,
}

impl ArticleCache {
    /// `window_hours == 0` is raised to 1.
    pub fn new(window_hours: u32) -> Self {
        Self {
            window_hours: window_hours.max(1),
            retained: Vec::new(),
            seen_urls: HashSet::new(),
        }
    }

    pub fn window_hours(&self) -> u32 {
        self.window_hours
    }

    pub fn window_secs(&self) -> i64 {
        i64::from(self.window_hours) * 3600
    }

    /// Drop every article with `datetime <= now - window`, keeping order, and rebuild the
    /// URL set. Articles without a timestamp cannot prove they are recent and go too.
    /// Returns the number of removed entries.
    pub fn prune(&mut self, now: i64) -> usize {
        let cutoff = now.saturating_sub(self.window_secs());
        let before = self.retained.len();
        self.retained
            .retain(|a| a.datetime.is_some_and(|ts| ts > cutoff));
        self.seen_urls = self.retained.iter().map(|a| a.url.clone()).collect();
        before - self.retained.len()
    }

    /// Remember a unique article.
    pub fn accept(&mut self, article: Article) {
        self.seen_urls.insert(article.url.clone());
        self.retained.push(article);
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    /// Retained articles in acceptance order.
    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.retained.iter()
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    pub fn url_count(&self) -> usize {
        self.seen_urls.len()
    }
}
