// src/dedup/stats.rs
use serde::Serialize;

/// Lifetime outcome counters of one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total_processed: u64,
    pub exact_url_dupes: u64,
    pub similarity_dupes: u64,
    pub unique_articles: u64,
}

impl Counters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Difference since an earlier snapshot of the same counters.
    pub fn since(&self, earlier: &Counters) -> Counters {
        Counters {
            total_processed: self.total_processed - earlier.total_processed,
            exact_url_dupes: self.exact_url_dupes - earlier.exact_url_dupes,
            similarity_dupes: self.similarity_dupes - earlier.similarity_dupes,
            unique_articles: self.unique_articles - earlier.unique_articles,
        }
    }
}

/// Read-only view returned by `DedupEngine::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub total_processed: u64,
    pub exact_url_dupes: u64,
    pub similarity_dupes: u64,
    pub unique_articles: u64,
    pub cache_size: usize,
    pub url_cache_size: usize,
}

impl DedupStats {
    pub fn new(c: Counters, cache_size: usize, url_cache_size: usize) -> Self {
        Self {
            total_processed: c.total_processed,
            exact_url_dupes: c.exact_url_dupes,
            similarity_dupes: c.similarity_dupes,
            unique_articles: c.unique_articles,
            cache_size,
            url_cache_size,
        }
    }

    pub fn duplicates(&self) -> u64 {
        self.exact_url_dupes + self.similarity_dupes
    }
}
