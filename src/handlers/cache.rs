//! Cache status and invalidation endpoints

use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{cached_json, AppState, Fresh};
use crate::error::{AppError, AppResult};
use crate::probes::ClearResult;
use crate::validation::{log_security_event, sanitize_output};

/// Cache types accepted by `/cache/clear`
pub const CACHE_TYPES: &[&str] = &["redis", "fastcgi", "api"];

/// Endpoint whose cached payload reflects the caches being cleared
const SERVICES_STATUS: &str = "/services/status";

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    #[serde(rename = "type")]
    pub types: Option<String>,
    /// Limit an `api` clear to one endpoint
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearWarnings {
    pub invalid_types: Vec<String>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub cleared: Vec<String>,
    pub results: BTreeMap<String, ClearResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<ClearWarnings>,
}

/// GET /api/cache/status
pub async fn cache_status(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/cache/status", Vec::new(), || async {
        let (redis, fastcgi) = tokio::join!(
            state.cache_backends.redis_status(),
            state.cache_backends.fastcgi_status(),
        );

        let cache = state.cache.clone();
        let api = tokio::task::spawn_blocking(move || cache.stats())
            .await
            .map_err(|e| AppError::Internal(format!("Cache stats task failed: {}", e)))?;
        state.metrics.cache_entries.set(api.entries as i64);

        Fresh::cache(json!({
            "redis": redis,
            "fastcgi": fastcgi,
            "api": api,
        }))
    })
    .await
}

/// POST /api/cache/clear?type=redis,fastcgi,api[&endpoint=/sites]
pub async fn cache_clear(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClearQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let requested = query
        .types
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Cache type parameter required. Valid types: {}",
                CACHE_TYPES.join(", ")
            ))
        })?;

    let (valid, invalid) = partition_types(requested);
    if valid.is_empty() {
        return Err(AppError::Validation(format!(
            "No valid cache types provided. Valid types: {}",
            CACHE_TYPES.join(", ")
        )));
    }

    let endpoint = match query.endpoint.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(e) if is_endpoint_path(e) => Some(e.to_string()),
        Some(e) => {
            log_security_event("Invalid cache endpoint", e, None);
            return Err(AppError::Validation("Invalid endpoint parameter".to_string()));
        }
    };

    let mut results = BTreeMap::new();
    for cache_type in &valid {
        let result = match cache_type.as_str() {
            "redis" => state.cache_backends.clear_redis().await,
            "fastcgi" => state.cache_backends.clear_fastcgi().await,
            _ => clear_api(&state, endpoint.clone()).await,
        };
        results.insert(cache_type.clone(), result);
    }

    // Service status reflects the caches just cleared
    let cache = state.cache.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || cache.clear(Some(SERVICES_STATUS))).await {
        tracing::warn!(error = %e, "Failed to invalidate service status cache");
    }

    let response = ClearResponse {
        success: results.values().all(|r| r.success),
        cleared: valid,
        results,
        warnings: (!invalid.is_empty()).then(|| ClearWarnings {
            invalid_types: invalid,
            message: "Some requested cache types were invalid and ignored",
        }),
    };

    let body = serde_json::to_value(response)
        .map_err(|e| AppError::Internal(format!("Failed to encode clear response: {}", e)))?;
    Ok(Json(sanitize_output(body)))
}

async fn clear_api(state: &AppState, endpoint: Option<String>) -> ClearResult {
    let cache = state.cache.clone();
    let target = endpoint.clone();
    match tokio::task::spawn_blocking(move || cache.clear(target.as_deref())).await {
        Ok(removed) => {
            log_security_event(
                "Cache cleared",
                &format!("API cache: {} entries ({})", removed, endpoint.as_deref().unwrap_or("all")),
                None,
            );
            ClearResult::ok(format!("API cache cleared ({} entries)", removed))
        }
        Err(e) => {
            tracing::error!(error = %e, "API cache clear task failed");
            ClearResult::failed("Failed to clear API cache")
        }
    }
}

/// Split a comma-separated type list into known (deduplicated, in order) and unknown
pub fn partition_types(requested: &str) -> (Vec<String>, Vec<String>) {
    let mut valid: Vec<String> = Vec::new();
    let mut invalid = Vec::new();
    for cache_type in requested.split(',').map(|t| t.trim().to_ascii_lowercase()) {
        if CACHE_TYPES.contains(&cache_type.as_str()) {
            if !valid.contains(&cache_type) {
                valid.push(cache_type);
            }
        } else if !cache_type.is_empty() {
            invalid.push(cache_type);
        }
    }
    (valid, invalid)
}

fn is_endpoint_path(endpoint: &str) -> bool {
    endpoint.starts_with('/')
        && endpoint.len() <= 100
        && endpoint
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
}
