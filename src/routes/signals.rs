//! Per-host signal queue endpoints.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::ApiError;
use crate::{AppState, models::Signal, signals::HostStatus};

/// Pending signals for a host, oldest first.
#[tracing::instrument(name = "signals.list", skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<Json<Vec<Signal>>, ApiError> {
    Ok(Json(state.signals.get_signals(&host_id).await?))
}

#[tracing::instrument(name = "signals.get", skip(state))]
pub async fn get(
    State(state): State<AppState>,
    Path((host_id, id)): Path<(String, String)>,
) -> Result<Json<Signal>, ApiError> {
    Ok(Json(state.signals.get_signal(&host_id, &id).await?))
}

#[tracing::instrument(name = "signals.delete", skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path((host_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.signals.delete_signal(&host_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drop every pending signal of a host.
#[tracing::instrument(name = "signals.truncate", skip(state))]
pub async fn truncate(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.signals.truncate_signals(&host_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Push a queued signal to the host's live connection.
#[tracing::instrument(name = "signals.notify", skip(state))]
pub async fn notify(
    State(state): State<AppState>,
    Path((host_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.signals.notify_signal(&host_id, &id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Liveness of every host that has connected since startup.
pub async fn host_status(State(state): State<AppState>) -> Json<HashMap<String, HostStatus>> {
    Json(state.signals.status().snapshot())
}
