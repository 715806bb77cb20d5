use std::sync::PoisonError;

use shuttle_axum::axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregator::SharedEngine;
use crate::article::Article;
use crate::dedup::DedupStats;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
}

impl AppState {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }
}

/// `/metrics` is merged in only when a recorder handle is supplied.
pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dedup", post(dedup_batch))
        .route("/stats", get(stats))
        .route("/stats/reset", post(reset_stats))
        .with_state(state);

    let app = match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    };
    app.layer(CorsLayer::very_permissive())
}

async fn dedup_batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<Article>>,
) -> Json<Vec<Article>> {
    let unique = state
        .engine
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .process(items);
    Json(unique)
}

async fn stats(State(state): State<AppState>) -> Json<DedupStats> {
    Json(
        state
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats(),
    )
}

async fn reset_stats(State(state): State<AppState>) -> Json<DedupStats> {
    let mut engine = state.engine.lock().unwrap_or_else(PoisonError::into_inner);
    engine.reset_stats();
    Json(engine.stats())
}
