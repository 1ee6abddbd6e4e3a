use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::MayflyError;
use crate::metrics;
use crate::server::AppState;
use crate::types::{Feature, ScoredDoc};

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Weighted query terms.
    pub features: Vec<Feature>,
    /// Maximum results to return; server default applies when omitted.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Matches, score descending with ascending-doc tie-break.
    pub results: Vec<ScoredDoc>,
}

/// Ranked-retrieval endpoint. Read-only: never blocks ingestion or
/// maintenance.
#[instrument(skip(state, req), fields(terms = req.features.len()))]
pub async fn query_index(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let limit = req.limit.unwrap_or(state.config.server.default_limit);
    if limit > state.config.server.max_limit {
        return Err(ApiError(MayflyError::Validation(format!(
            "limit {} exceeds maximum of {}",
            limit, state.config.server.max_limit
        ))));
    }
    for feature in &req.features {
        if !feature.weight.is_finite() {
            return Err(ApiError(MayflyError::Validation(format!(
                "non-finite weight for term {}",
                feature.term_id
            ))));
        }
    }

    metrics::QUERIES_TOTAL.inc();
    let timer = metrics::QUERY_DURATION.start_timer();
    let results = state.executor.execute(&req.features, limit);
    timer.observe_duration();

    Ok(Json(QueryResponse { results }))
}
