//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::cache::CacheStats;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub cache: CacheHealth,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving with a working cache directory
    Healthy,
    /// Serving, but every request recomputes
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    /// Cache directory exists and is a directory
    pub available: bool,
    #[serde(flatten)]
    pub stats: CacheStats,
}

/// Health check handler
///
/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.cache.clone();
    let (available, stats) = match tokio::task::spawn_blocking(move || {
        (cache.store().dir().is_dir(), cache.stats())
    })
    .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Cache stats task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(degraded(&state)));
        }
    };

    state.metrics.cache_entries.set(stats.entries as i64);

    let response = HealthResponse {
        status: if available {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        cache: CacheHealth { available, stats },
    };

    (StatusCode::OK, Json(response))
}

fn degraded(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: HealthStatus::Degraded,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        cache: CacheHealth {
            available: false,
            stats: CacheStats {
                dir: state.config.cache.dir.display().to_string(),
                entries: 0,
                default_ttl_secs: state.config.cache.default_ttl_secs,
                sweep_interval_secs: state.config.cache.sweep_interval_secs,
                last_sweep_at: None,
                sweep_passes: 0,
            },
        },
    }
}

/// Simple health check (for load balancers)
///
/// GET /health
pub async fn health_simple() -> StatusCode {
    StatusCode::OK
}
