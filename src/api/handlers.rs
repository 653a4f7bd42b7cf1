//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;

use crate::arbitrage::ScanStats;

/// Application state shared with handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// Whether at least one scan has completed.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// Cumulative scan statistics.
    pub stats: Arc<tokio::sync::RwLock<ScanStats>>,
    /// Prometheus handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ready", &self.is_ready())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Create new app state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a Prometheus handle for the metrics endpoint.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether a scan has completed.
    pub ready: bool,
    /// Consecutive failed scans.
    pub consecutive_failures: u32,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// "ok", "degraded" (recent failures) or "starting".
    pub status: &'static str,
    /// Statistics.
    pub stats: ScanStats,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let consecutive_failures = state.stats.read().await.consecutive_failures;

    let response = ReadyResponse {
        ready: is_ready,
        consecutive_failures,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns scan statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.stats.read().await.clone();

    let status = if !state.is_ready() {
        "starting"
    } else if stats.consecutive_failures > 0 {
        "degraded"
    } else {
        "ok"
    };

    Json(StatusResponse { status, stats })
}

/// Prometheus metrics handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::NOT_FOUND,
            "metrics recorder not installed".to_string(),
        ),
    }
}
