// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use news_dedup::aggregator::{shared_engine, SharedEngine};
use news_dedup::api::{self, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(engine: &SharedEngine) -> Router {
    api::router(AppState::new(engine.clone()), None)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .oneshot(req.body(body).expect("build request"))
        .await
        .expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn health_returns_ok() {
    let engine = shared_engine(24);
    let (status, bytes) = send(test_router(&engine), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap(), "ok");
}

#[tokio::test]
async fn dedup_filters_and_stats_track_it() {
    let engine = shared_engine(24);
    let now = chrono::Utc::now().timestamp();
    let batch = json!([
        { "headline": "Apple announces iPhone", "url": "https://a/1", "source": "Reuters", "related": "AAPL", "datetime": now },
        { "headline": "Apple announces iPhone", "url": "https://a/1", "source": "Reuters", "related": "AAPL", "datetime": now },
        { "headline": "Google updates search", "url": "https://a/3", "source": "Reuters", "related": null, "datetime": now }
    ]);

    let (status, bytes) = send(test_router(&engine), "POST", "/dedup", Some(batch)).await;
    assert_eq!(status, StatusCode::OK);
    let out: Json = serde_json::from_slice(&bytes).expect("json");
    let arr = out.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["url"], "https://a/1");
    assert_eq!(arr[1]["headline"], "Google updates search");

    let (status, bytes) = send(test_router(&engine), "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let s: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(s["total_processed"], 3);
    assert_eq!(s["exact_url_dupes"], 1);
    assert_eq!(s["similarity_dupes"], 0);
    assert_eq!(s["unique_articles"], 2);
    assert_eq!(s["cache_size"], 2);
    assert_eq!(s["url_cache_size"], 2);

    let (status, bytes) = send(test_router(&engine), "POST", "/stats/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    let r: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(r["total_processed"], 0);
    assert_eq!(r["cache_size"], 2);
}

#[tokio::test]
async fn dedup_rejects_non_array_body() {
    let engine = shared_engine(24);
    let (status, _) = send(
        test_router(&engine),
        "POST",
        "/dedup",
        Some(json!({ "headline": "not a batch" })),
    )
    .await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn metrics_route_absent_without_handle() {
    let engine = shared_engine(24);
    let (status, _) = send(test_router(&engine), "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
