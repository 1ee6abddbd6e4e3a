/// HTTP request handlers for all API endpoints.
pub mod handlers;
/// Custom middleware (request IDs, HTTP metrics).
pub mod middleware;
/// Axum router construction and route definitions.
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::index::IndexManager;
use crate::pipeline::{IndexView, UpdatePipeline};
use crate::query::QueryExecutor;

/// Shared application state injected into all handlers via axum's State
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// Owns the event index and its maintenance task.
    pub manager: Arc<IndexManager>,
    /// Bounded update queue and workers.
    pub pipeline: Arc<UpdatePipeline>,
    /// Ingestion façade used by the document handler.
    pub view: Arc<IndexView>,
    /// Ranked-retrieval executor used by the query handler.
    pub executor: Arc<QueryExecutor>,
    /// Global server and index configuration.
    pub config: Arc<Config>,
}
