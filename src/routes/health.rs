//! Health and metrics endpoints.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;
#[cfg(feature = "prometheus")]
use crate::observability::metrics::get_prometheus_handle;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "ok" or "unhealthy"
    pub status: &'static str,
    pub version: &'static str,
    pub subsystems: SubsystemStatus,
}

#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
    pub cache: ComponentStatus,
    pub agents_online: usize,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Health check with subsystem status.
///
/// A failing database makes the service unhealthy. A failing cache only
/// degrades signal delivery and is reported without changing the status.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut healthy = true;

    let database = match &state.db {
        Some(db) => {
            let start = std::time::Instant::now();
            let result = db.health_check().await;
            let latency_ms = start.elapsed().as_millis() as u64;
            healthy &= result.is_ok();
            Some(ComponentStatus {
                healthy: result.is_ok(),
                message: result.err().map(|e| e.to_string()),
                latency_ms,
            })
        }
        None => None,
    };

    let start = std::time::Instant::now();
    let cache_result = state.cache.get_bytes("__health_check__").await;
    let cache = ComponentStatus {
        healthy: cache_result.is_ok(),
        message: cache_result
            .err()
            .map(|_| "Cache connection failed".to_string()),
        latency_ms: start.elapsed().as_millis() as u64,
    };

    let health = HealthStatus {
        status: if healthy { "ok" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        subsystems: SubsystemStatus {
            database,
            cache,
            agents_online: state.signals.status().online_count(),
        },
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "health.metrics")]
pub async fn metrics() -> impl IntoResponse {
    #[cfg(feature = "prometheus")]
    {
        return match get_prometheus_handle() {
            Some(handle) => (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            ),
            None => (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            ),
        };
    }
    #[cfg(not(feature = "prometheus"))]
    (
        StatusCode::NOT_FOUND,
        [("content-type", "text/plain")],
        "Prometheus metrics not enabled".to_string(),
    )
}
