// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::article::Article;
use crate::ingest::types::ArticleProvider;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Articles parsed from providers.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
    });
}

/// Normalize provider text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (\s covers nbsp)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars (long summaries)
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Fetch every provider once, in order. Failing providers are logged and skipped.
pub async fn run_once(providers: &[Box<dyn ArticleProvider>]) -> Vec<Article> {
    ensure_metrics_described();

    let mut all = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => {
                tracing::info!(target: "ingest", provider = p.name(), fetched = v.len(), "provider fetched");
                all.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }
    all
}

/// Current unix seconds (fallback timestamp for records without one).
pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
