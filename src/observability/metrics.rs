//! Prometheus metrics for the retention engine.
//!
//! Provides metrics for:
//! - Policy evaluation ticks and per-record actions
//! - Archival job reconciliation and garbage collection
//! - Signal queue operations and live agent connections

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Global Prometheus handle for the metrics endpoint.
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with the given configuration.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            &[0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0],
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let handle = builder.install_recorder().map_err(MetricsError::Install)?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;

    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
#[cfg(feature = "prometheus")]
pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record one policy evaluation tick.
///
/// # Arguments
/// * `status` - "ok" when the tick ran, "failed" when policies could not be loaded
/// * `duration_secs` - Wall time of the tick
pub fn record_policy_tick(status: &str, duration_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archivist_policy_ticks_total", "status" => status.to_string()).increment(1);
        histogram!("archivist_policy_tick_duration_seconds").record(duration_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (status, duration_secs);
    }
}

/// Record per-record policy decisions.
///
/// `action` is one of "kept", "archive_submitted", "delete_archive_submitted",
/// "deleted", "converted_to_archive", "skipped" or "failed".
pub fn record_policy_action(action: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archivist_policy_actions_total", "action" => action.to_string())
            .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (action, count);
    }
}

/// Record archival job reconciliation outcomes.
pub fn record_job_reconciled(outcome: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archivist_jobs_reconciled_total", "outcome" => outcome.to_string())
            .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (outcome, count);
    }
}

/// Record completed jobs removed by age-based garbage collection.
pub fn record_jobs_collected(count: u64) {
    #[cfg(feature = "prometheus")]
    counter!("archivist_jobs_collected_total").increment(count);
    #[cfg(not(feature = "prometheus"))]
    let _ = count;
}

/// Record a signal queue operation ("add", "delete", "truncate", "notify", "deliver", "ack").
pub fn record_signal(operation: &str) {
    #[cfg(feature = "prometheus")]
    counter!("archivist_signals_total", "operation" => operation.to_string()).increment(1);
    #[cfg(not(feature = "prometheus"))]
    let _ = operation;
}

/// Set the number of live agent connections.
pub fn set_agent_connections(count: usize) {
    #[cfg(feature = "prometheus")]
    gauge!("archivist_agent_connections").set(count as f64);
    #[cfg(not(feature = "prometheus"))]
    let _ = count;
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
