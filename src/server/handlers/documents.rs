use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::MayflyError;
use crate::metrics;
use crate::server::AppState;
use crate::types::DocumentDescriptor;

use super::ApiError;

#[derive(Debug, Serialize)]
pub struct FeedDocumentResponse {
    /// Number of (term, doc) tuples accepted for indexing.
    pub accepted: usize,
}

/// Ingestion endpoint: validates the document and enqueues its postings.
/// Accepted documents become visible at the next maintenance apply.
#[instrument(skip(state, doc), fields(doc_id = doc.doc_id, features = doc.features.len()))]
pub async fn feed_document(
    State(state): State<AppState>,
    Json(doc): Json<DocumentDescriptor>,
) -> Result<(StatusCode, Json<FeedDocumentResponse>), ApiError> {
    match state.view.feed(&doc) {
        Ok(accepted) => {
            metrics::DOCUMENTS_INGESTED_TOTAL.inc();
            info!(accepted, "document enqueued");
            Ok((
                StatusCode::ACCEPTED,
                Json(FeedDocumentResponse { accepted }),
            ))
        }
        Err(e) => {
            let reason = match &e {
                MayflyError::QueueFull => "queue_full",
                MayflyError::PipelineStopped => "stopping",
                _ => "invalid",
            };
            metrics::INGEST_REJECTED_TOTAL
                .with_label_values(&[reason])
                .inc();
            Err(ApiError(e))
        }
    }
}
