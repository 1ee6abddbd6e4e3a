use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use crate::error::MayflyError;
use crate::server::AppState;

use super::ApiError;

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    /// Snapshot prefix the dump was written to.
    pub prefix: String,
}

/// Operator-triggered snapshot dump to the configured prefix.
#[instrument(skip(state))]
pub async fn trigger_snapshot(
    State(state): State<AppState>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let prefix = state.config.index.snapshot_prefix.clone();
    if prefix.is_empty() {
        return Err(ApiError(MayflyError::Validation(
            "snapshot_prefix not configured".into(),
        )));
    }

    // The dump quiesces writers and hits the filesystem; keep it off the
    // request workers.
    let manager = state.manager.clone();
    let dump_prefix = prefix.clone();
    tokio::task::spawn_blocking(move || manager.dump(&dump_prefix))
        .await
        .map_err(|e| ApiError(MayflyError::Snapshot(format!("dump task failed: {e}"))))?
        .map_err(ApiError)?;

    Ok(Json(SnapshotResponse { prefix }))
}
