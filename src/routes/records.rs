use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use super::ApiError;
use crate::{AppState, services::RecoverOutcome};

#[derive(Debug, Serialize)]
pub struct RecoverResponse {
    /// Archival job id for a restore, signal id for a direct download.
    pub job_id: String,
}

/// Bring a record's object back to its host.
///
/// Archived records are restored into object storage first (202). Live
/// backups are signalled to the agent right away (200).
#[tracing::instrument(name = "records.recover", skip(state))]
pub async fn recover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecoverResponse>), ApiError> {
    let recovery = state.recovery.as_ref().ok_or_else(ApiError::database_required)?;

    let response = match recovery.recover(id).await? {
        RecoverOutcome::Restoring { job_id } => (
            StatusCode::ACCEPTED,
            Json(RecoverResponse {
                job_id: job_id.to_string(),
            }),
        ),
        RecoverOutcome::Downloading { signal_id } => {
            (StatusCode::OK, Json(RecoverResponse { job_id: signal_id }))
        }
    };
    Ok(response)
}
