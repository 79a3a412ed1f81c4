//! HTTP handlers for search and health.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::ServiceError;
use crate::metrics;
use crate::present::SearchView;
use crate::router::Dataset;
use crate::search::SearchEngine;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<SearchEngine>,
    default_top_k: usize,
}

impl AppState {
    /// Create handler state around a loaded engine.
    pub fn new(engine: Arc<SearchEngine>, default_top_k: usize) -> Self {
        Self {
            engine,
            default_top_k,
        }
    }
}

/// Query string of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthView {
    pub status: String,
    pub meeting_records: usize,
    pub domain_records: usize,
    pub embedder: String,
}

/// `GET /search?q=..&k=..`: route, search and return ranked records.
#[instrument(skip_all, fields(query))]
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchView>, ServiceError> {
    let Query(params) = params.map_err(|rejection| {
        ServiceError::InvalidRequest(format!("Invalid query string: {}", rejection.body_text()))
    })?;
    tracing::Span::current().record("query", params.q.as_str());

    let k = params.k.unwrap_or(state.default_top_k);

    info!(query = %params.q, top_k = k, "Processing search request");

    // No search is triggered for an empty query
    if params.q.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("Query cannot be empty".into()));
    }

    let engine = Arc::clone(&state.engine);
    let query = params.q;
    let result = tokio::task::spawn_blocking(move || engine.search_routed(&query, k))
        .await
        .map_err(|e| {
            error!(error = %e, "Search task failed");
            ServiceError::Internal(format!("Search task error: {}", e))
        })?;

    match result {
        Ok(outcome) => {
            metrics::record_search_latency(outcome.took_ms as f64);
            metrics::increment_search_count(outcome.dataset);
            Ok(Json(SearchView::from(outcome)))
        }
        Err(e) => {
            metrics::increment_search_errors();
            error!(error = %e, "Search failed");
            Err(e)
        }
    }
}

/// `GET /health`: the engine only exists once both datasets loaded.
pub async fn health(State(state): State<AppState>) -> Json<HealthView> {
    let engine = &state.engine;
    Json(HealthView {
        status: "serving".to_string(),
        meeting_records: engine.dataset(Dataset::Meeting).metadata().len(),
        domain_records: engine.dataset(Dataset::Domain).metadata().len(),
        embedder: engine.embedder().name().to_string(),
    })
}
