use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct IndexStatsResponse {
    /// Published postings in the index.
    pub posting_count: u64,
    /// Tracked (term, doc) deadline pairs.
    pub expire_table_size: usize,
    /// Edits published since process start.
    pub updates_applied: u64,
    /// Postings evicted by expiration since process start.
    pub updates_expired: u64,
    /// Jobs waiting in the update queue.
    pub queue_depth: usize,
}

/// Observable engine counters.
pub async fn index_stats(State(state): State<AppState>) -> Json<IndexStatsResponse> {
    Json(IndexStatsResponse {
        posting_count: state.manager.posting_count(),
        expire_table_size: state.manager.expire_table_size(),
        updates_applied: state.manager.updates_applied(),
        updates_expired: state.manager.updates_expired(),
        queue_depth: state.pipeline.queue_depth(),
    })
}
