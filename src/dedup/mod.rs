// src/dedup/mod.rs
//! # Dedup Engine
//! Windowed, three-level near-duplicate filter for normalized articles.
//!
//! For every candidate, in order, stopping at the first hit:
//! 1. **Exact URL**: the url was already accepted inside the window.
//! 2. **Same source**: a cached article from the same `source` has a headline
//!    similarity above [`SAME_SOURCE_THRESHOLD`].
//! 3. **Correlated**: a cached article published less than
//!    [`CORRELATION_WINDOW_SECS`] apart shares at least one `related` symbol and has a
//!    headline similarity above [`CORRELATED_THRESHOLD`].
//!
//! Levels 2 and 3 run in one pass over the cache. Unique articles are cached right away,
//! so duplicates inside a single batch are caught as well.
//!
//! The engine performs no I/O and holds no locks; `&mut self` on `process` is the
//! serialization point. Share it behind a mutex if several tasks feed it.

pub mod cache;
pub mod similarity;
pub mod stats;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::article::Article;
pub use cache::ArticleCache;
pub use similarity::similarity;
pub use stats::{Counters, DedupStats};

/// Headline similarity required between two articles of the same source.
pub const SAME_SOURCE_THRESHOLD: f64 = 0.85;
/// Headline similarity required for time + symbol correlated articles.
pub const CORRELATED_THRESHOLD: f64 = 0.70;
/// Correlated articles must be published strictly less than this apart.
pub const CORRELATION_WINDOW_SECS: u64 = 300;

pub const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duplicate {
    ExactUrl,
    SameSource { similarity: f64 },
    Correlated { similarity: f64, seconds_apart: u64 },
}

impl Duplicate {
    pub fn level(&self) -> u8 {
        match self {
            Duplicate::ExactUrl => 1,
            Duplicate::SameSource { .. } => 2,
            Duplicate::Correlated { .. } => 3,
        }
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dedup_processed_total", "Articles evaluated by the dedup engine.");
        describe_counter!("dedup_exact_url_total", "Articles dropped on exact URL match.");
        describe_counter!(
            "dedup_similarity_total",
            "Articles dropped on headline similarity (same source or correlated)."
        );
        describe_counter!("dedup_unique_total", "Articles accepted as unique.");
        describe_gauge!("dedup_cache_size", "Articles currently retained in the window.");
    });
}

#[derive(Debug, Clone)]
pub struct DedupEngine {
    cache: ArticleCache,
    counters: Counters,
}

impl Default for DedupEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_HOURS)
    }
}

impl DedupEngine {
    pub fn new(window_hours: u32) -> Self {
        Self {
            cache: ArticleCache::new(window_hours),
            counters: Counters::default(),
        }
    }

    pub fn window_hours(&self) -> u32 {
        self.cache.window_hours()
    }

    /// Filter a batch against the window using the wall clock.
    pub fn process(&mut self, batch: Vec<Article>) -> Vec<Article> {
        self.process_at(batch, chrono::Utc::now().timestamp())
    }

    /// Same as [`process`](Self::process) with an explicit "now" (unix seconds).
    /// Output keeps the input order; empty input is a no-op.
    pub fn process_at(&mut self, batch: Vec<Article>, now: i64) -> Vec<Article> {
        if batch.is_empty() {
            return Vec::new();
        }
        ensure_metrics_described();

        self.prune_at(now);

        let before = self.counters;
        let total = batch.len();
        let mut unique = Vec::with_capacity(total);

        for article in batch {
            self.counters.total_processed += 1;
            match self.find_duplicate(&article) {
                None => {
                    self.cache.accept(article.clone());
                    unique.push(article);
                    self.counters.unique_articles += 1;
                }
                Some(dup) => {
                    match dup {
                        Duplicate::ExactUrl => self.counters.exact_url_dupes += 1,
                        Duplicate::SameSource { .. } | Duplicate::Correlated { .. } => {
                            self.counters.similarity_dupes += 1
                        }
                    }
                    tracing::debug!(
                        target: "dedup",
                        level = dup.level(),
                        verdict = ?dup,
                        headline = %truncate_chars(&article.headline, 50),
                        "duplicate dropped"
                    );
                }
            }
        }

        // Telemetry
        let delta = self.counters.since(&before);
        counter!("dedup_processed_total").increment(delta.total_processed);
        counter!("dedup_exact_url_total").increment(delta.exact_url_dupes);
        counter!("dedup_similarity_total").increment(delta.similarity_dupes);
        counter!("dedup_unique_total").increment(delta.unique_articles);
        gauge!("dedup_cache_size").set(self.cache.len() as f64);

        tracing::info!(
            target: "dedup",
            kept = unique.len(),
            total,
            cache = self.cache.len(),
            "deduplication: {}/{} unique articles",
            unique.len(),
            total
        );
        unique
    }

    /// Expire cached entries older than the window. `process_at` does this itself; call it
    /// directly to age the cache without a batch.
    pub fn prune_at(&mut self, now: i64) -> usize {
        let removed = self.cache.prune(now);
        if removed > 0 {
            tracing::debug!(target: "dedup", removed, "cleaned old articles from cache");
        }
        removed
    }

    /// Classify `candidate` against the current window without mutating anything.
    pub fn find_duplicate(&self, candidate: &Article) -> Option<Duplicate> {
        if self.cache.contains_url(&candidate.url) {
            return Some(Duplicate::ExactUrl);
        }
        self.cache.iter().find_map(|seen| compare(candidate, seen))
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats::new(self.counters, self.cache.len(), self.cache.url_count())
    }

    /// Zero the counters; cached articles stay.
    pub fn reset_stats(&mut self) {
        self.counters.reset();
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }
}

/// Levels 2 and 3 for one cached entry.
fn compare(candidate: &Article, seen: &Article) -> Option<Duplicate> {
    let mut sim: Option<f64> = None;
    let mut headline_sim = || *sim.get_or_insert_with(|| similarity(&candidate.headline, &seen.headline));

    if candidate.source == seen.source {
        let s = headline_sim();
        if s > SAME_SOURCE_THRESHOLD {
            tracing::debug!(target: "dedup", similarity = s, "similar match (source)");
            return Some(Duplicate::SameSource { similarity: s });
        }
    }

    let seconds_apart = candidate.seconds_apart(seen)?;
    if seconds_apart >= CORRELATION_WINDOW_SECS {
        return None;
    }
    let ours = candidate.symbols();
    let theirs = seen.symbols();
    if ours.is_empty() || theirs.is_empty() || ours.is_disjoint(&theirs) {
        return None;
    }
    let s = headline_sim();
    if s > CORRELATED_THRESHOLD {
        tracing::debug!(target: "dedup", similarity = s, seconds_apart, "similar match (time+symbol)");
        return Some(Duplicate::Correlated {
            similarity: s,
            seconds_apart,
        });
    }
    None
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn art(headline: &str, url: &str, source: &str, related: &str, offset: i64) -> Article {
        Article {
            headline: headline.into(),
            url: url.into(),
            source: source.into(),
            related: related.into(),
            datetime: Some(NOW + offset),
            ..Default::default()
        }
    }

    #[test]
    fn exact_url_wins_before_similarity() {
        let mut e = DedupEngine::new(24);
        let a = art("Fed holds rates", "https://x/1", "Reuters", "", 0);
        let b = art("Completely different", "https://x/1", "Other", "", 0);
        e.process_at(vec![a], NOW);
        assert_eq!(e.find_duplicate(&b), Some(Duplicate::ExactUrl));
    }

    #[test]
    fn same_source_requires_same_source() {
        let mut e = DedupEngine::new(24);
        e.process_at(
            vec![art("Fed holds rates steady, signals patience", "u1", "Reuters", "", 0)],
            NOW,
        );
        let same = art("Fed holds rates steady and signals patience", "u2", "Reuters", "", 0);
        let other = art("Fed holds rates steady and signals patience", "u3", "Bloomberg", "", 0);
        assert!(matches!(
            e.find_duplicate(&same),
            Some(Duplicate::SameSource { .. })
        ));
        assert_eq!(e.find_duplicate(&other), None);
    }

    #[test]
    fn correlated_needs_time_symbols_and_similarity() {
        let mut e = DedupEngine::new(24);
        e.process_at(
            vec![art("Nvidia unveils new AI chip", "u1", "Reuters", "NVDA", 0)],
            NOW,
        );
        // 0.83: too low for same source, enough for correlated
        let close = art("Nvidia reveals next AI chip", "u2", "Bloomberg", "NVDA,AMD", 60);
        assert!(matches!(
            e.find_duplicate(&close),
            Some(Duplicate::Correlated { seconds_apart: 60, .. })
        ));

        let same_src = art("Nvidia reveals next AI chip", "u3", "Reuters", "", 60);
        assert_eq!(e.find_duplicate(&same_src), None);

        let at_limit = art("Nvidia reveals next AI chip", "u4", "Bloomberg", "NVDA", 300);
        assert_eq!(e.find_duplicate(&at_limit), None);

        let no_overlap = art("Nvidia reveals next AI chip", "u5", "Bloomberg", "AMD", 60);
        assert_eq!(e.find_duplicate(&no_overlap), None);

        let undated = Article {
            datetime: None,
            ..art("Nvidia reveals next AI chip", "u6", "Bloomberg", "NVDA", 0)
        };
        assert_eq!(e.find_duplicate(&undated), None);
    }

    #[test]
    fn within_batch_duplicates_are_caught() {
        let mut e = DedupEngine::new(24);
        let out = e.process_at(
            vec![
                art("Nvidia unveils new AI chip", "u1", "Reuters", "NVDA", 0),
                art("Nvidia reveals next AI chip", "u2", "Bloomberg", "NVDA", 30),
            ],
            NOW,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "u1");
        assert_eq!(e.stats().similarity_dupes, 1);
    }

    #[test]
    fn empty_batch_has_no_side_effects() {
        let mut e = DedupEngine::new(1);
        e.process_at(vec![art("old", "u-old", "S", "", 0)], NOW);
        let out = e.process_at(Vec::new(), NOW + 10 * 3600);
        assert!(out.is_empty());
        // not pruned, counters unchanged
        assert_eq!(e.stats().cache_size, 1);
        assert_eq!(e.stats().total_processed, 1);
        assert_eq!(e.prune_at(NOW + 10 * 3600), 1);
        assert_eq!(e.stats().cache_size, 0);
    }

    #[test]
    fn reset_keeps_cache() {
        let mut e = DedupEngine::new(24);
        e.process_at(vec![art("a", "u1", "S", "", 0), art("a", "u1", "S", "", 0)], NOW);
        e.reset_stats();
        let s = e.stats();
        assert_eq!(s.total_processed, 0);
        assert_eq!(s.exact_url_dupes, 0);
        assert_eq!(s.cache_size, 1);
        assert_eq!(s.url_cache_size, 1);
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("hi", 50), "hi");
    }
}
