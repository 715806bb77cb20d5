// tests/dedup_engine.rs
//
// Behavioral scenarios for the dedup engine through its public API only.

use news_dedup::article::Article;
use news_dedup::dedup::{DedupEngine, Duplicate};

const T0: i64 = 1_718_791_200;

fn art(headline: &str, url: &str, source: &str, related: &str, ts: Option<i64>) -> Article {
    Article {
        headline: headline.into(),
        url: url.into(),
        source: source.into(),
        related: related.into(),
        datetime: ts,
        ..Default::default()
    }
}

fn headlines(v: &[Article]) -> Vec<&str> {
    v.iter().map(|a| a.headline.as_str()).collect()
}

#[test]
fn distinct_articles_pass_through_in_order() {
    let mut e = DedupEngine::new(24);
    let batch = vec![
        art("Apple announces iPhone", "https://a/1", "Reuters", "AAPL", Some(T0)),
        art("Tesla launches new car", "https://a/2", "Reuters", "TSLA", Some(T0)),
        art("Google updates search", "https://a/3", "Reuters", "GOOGL", Some(T0)),
    ];
    let out = e.process_at(batch.clone(), T0);
    assert_eq!(out, batch);

    let s = e.stats();
    assert_eq!(s.total_processed, 3);
    assert_eq!(s.unique_articles, 3);
    assert_eq!(s.cache_size, 3);
    assert_eq!(s.url_cache_size, 3);
}

#[test]
fn repeated_url_is_dropped_across_calls() {
    let mut e = DedupEngine::new(24);
    let a = art("Gold hits record high", "https://x/gold", "Bloomberg", "", Some(T0));
    assert_eq!(e.process_at(vec![a.clone()], T0).len(), 1);

    let mut again = a.clone();
    again.headline = "Completely different wording".into();
    again.source = "Other".into();
    assert!(e.process_at(vec![again], T0 + 60).is_empty());
    assert_eq!(e.stats().exact_url_dupes, 1);
}

#[test]
fn same_source_rewrite_is_dropped() {
    let mut e = DedupEngine::new(24);
    // 0.94 similar, no symbols, an hour apart: only the same-source rule can match.
    let first = art("Fed holds rates steady, signals patience", "https://mw/1", "MarketWatch", "", Some(T0));
    let second = art("Fed holds rates steady and signals patience", "https://mw/2", "MarketWatch", "", Some(T0 + 3_600));
    e.process_at(vec![first], T0);

    assert!(matches!(
        e.find_duplicate(&second),
        Some(Duplicate::SameSource { similarity }) if similarity > 0.85
    ));
    assert!(e.process_at(vec![second], T0 + 3_600).is_empty());
    assert_eq!(e.stats().similarity_dupes, 1);
}

#[test]
fn same_rewrite_from_another_source_without_symbols_is_kept() {
    let mut e = DedupEngine::new(24);
    let first = art("Fed holds rates steady, signals patience", "https://mw/1", "MarketWatch", "", Some(T0));
    let second = art("Fed holds rates steady and signals patience", "https://cnbc/1", "CNBC", "", Some(T0 + 10));
    let out = e.process_at(vec![first, second], T0 + 10);
    assert_eq!(out.len(), 2);
}

#[test]
fn apple_reworded_same_instant_is_caught_by_symbol_overlap() {
    let mut e = DedupEngine::new(24);
    let a = art("Apple announces new iPhone", "https://r/1", "Reuters", "AAPL", Some(T0));
    let b = art("Apple unveils new iPhone", "https://r/2", "Reuters", "AAPL", Some(T0));
    e.process_at(vec![a], T0);

    // 0.84 is not above the same-source bar, but the shared ticker and timestamp decide.
    match e.find_duplicate(&b) {
        Some(Duplicate::Correlated { similarity, seconds_apart }) => {
            assert!((similarity - 0.84).abs() < 1e-9);
            assert_eq!(seconds_apart, 0);
        }
        other => panic!("expected correlated duplicate, got {other:?}"),
    }
    assert!(e.process_at(vec![b], T0).is_empty());
}

#[test]
fn correlated_cross_source_story_within_five_minutes() {
    let mut e = DedupEngine::new(24);
    let batch = vec![
        art("Tesla stock rises on delivery beat", "https://bbg/1", "Bloomberg", "TSLA", Some(T0)),
        art("Tesla shares rise on delivery beat", "https://cnbc/9", "CNBC", "TSLA", Some(T0 + 120)),
    ];
    let out = e.process_at(batch, T0 + 120);
    assert_eq!(headlines(&out), vec!["Tesla stock rises on delivery beat"]);
    assert_eq!(e.stats().similarity_dupes, 1);
}

#[test]
fn loosely_related_headlines_stay_separate() {
    let mut e = DedupEngine::new(24);
    let batch = vec![
        art("Tesla stock rises", "https://bbg/1", "Bloomberg", "TSLA", Some(T0)),
        art("Tesla shares increase", "https://cnbc/1", "CNBC", "TSLA", Some(T0 + 120)),
    ];
    assert_eq!(e.process_at(batch, T0 + 120).len(), 2);
}

#[test]
fn correlation_window_is_exclusive() {
    let mut e = DedupEngine::new(24);
    let first = art("Tesla stock rises on delivery beat", "https://bbg/1", "Bloomberg", "TSLA", Some(T0));
    e.process_at(vec![first], T0);

    let at_limit = art("Tesla shares rise on delivery beat", "https://cnbc/1", "CNBC", "TSLA", Some(T0 + 300));
    assert_eq!(e.find_duplicate(&at_limit), None);

    let inside = art("Tesla shares rise on delivery beat", "https://cnbc/2", "CNBC", "TSLA", Some(T0 - 299));
    assert!(matches!(
        e.find_duplicate(&inside),
        Some(Duplicate::Correlated { seconds_apart: 299, .. })
    ));
}

#[test]
fn undated_articles_never_correlate_and_expire_at_next_prune() {
    let mut e = DedupEngine::new(24);
    let first = art("Tesla stock rises on delivery beat", "https://bbg/1", "Bloomberg", "TSLA", None);
    let second = art("Tesla shares rise on delivery beat", "https://cnbc/1", "CNBC", "TSLA", Some(T0));
    let out = e.process_at(vec![first, second], T0);
    assert_eq!(out.len(), 2);
    assert_eq!(e.cache().len(), 2);

    // Next batch prunes the undated entry, so its url becomes new again.
    let replay = art("Tesla stock rises on delivery beat", "https://bbg/1", "Bloomberg", "", None);
    assert_eq!(e.process_at(vec![replay], T0 + 1).len(), 1);
}

#[test]
fn articles_older_than_the_window_are_forgotten() {
    let mut e = DedupEngine::new(1);
    let a = art("Oil slips as inventories build", "https://o/1", "Reuters", "", Some(T0));
    assert_eq!(e.process_at(vec![a.clone()], T0).len(), 1);

    // still inside the hour
    assert!(e.process_at(vec![a.clone()], T0 + 3_599).is_empty());

    // exactly one window later the entry is at the cutoff and goes
    let out = e.process_at(vec![a], T0 + 3_600);
    assert_eq!(out.len(), 1);
    assert_eq!(e.cache().len(), 1);
}

#[test]
fn zero_window_is_clamped_to_one_hour() {
    let e = DedupEngine::new(0);
    assert_eq!(e.window_hours(), 1);
}

#[test]
fn empty_urls_collide_with_each_other() {
    let mut e = DedupEngine::new(24);
    let batch = vec![
        art("Copper rallies on supply fears", "", "Reuters", "", Some(T0)),
        art("Wheat futures slide", "", "Bloomberg", "", Some(T0)),
    ];
    let out = e.process_at(batch, T0);
    assert_eq!(headlines(&out), vec!["Copper rallies on supply fears"]);
    assert_eq!(e.stats().exact_url_dupes, 1);
}

#[test]
fn counters_always_add_up() {
    let mut e = DedupEngine::new(24);
    let batch = vec![
        art("Nvidia unveils new AI chip", "https://r/1", "Reuters", "NVDA", Some(T0)),
        art("Nvidia unveils new AI chip", "https://r/1", "Reuters", "NVDA", Some(T0)),
        art("Nvidia reveals next AI chip", "https://b/1", "Benzinga", "NVDA", Some(T0 + 60)),
        art("Microsoft beats on cloud revenue", "https://b/2", "Benzinga", "MSFT", Some(T0 + 60)),
    ];
    let out = e.process_at(batch, T0 + 60);
    assert_eq!(out.len(), 2);

    let s = e.stats();
    assert_eq!(s.total_processed, 4);
    assert_eq!(s.exact_url_dupes, 1);
    assert_eq!(s.similarity_dupes, 1);
    assert_eq!(s.unique_articles, 2);
    assert_eq!(
        s.total_processed,
        s.exact_url_dupes + s.similarity_dupes + s.unique_articles
    );
    assert_eq!(s.duplicates(), 2);

    e.reset_stats();
    let s = e.stats();
    assert_eq!(s.total_processed, 0);
    assert_eq!(s.cache_size, 2);
}
