//! Cache-aside helper shared by the read endpoints
//!
//! Looks the endpoint up in the response cache and answers with the stored
//! payload on a hit. On a miss the handler's computation runs, its output is
//! HTML-escaped and stored, and the fresh payload is returned. Cache I/O runs
//! on the blocking pool; a broken cache only costs a recomputation.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::AppState;
use crate::error::AppResult;
use crate::validation::sanitize_output;

/// Header reporting whether the body came from the cache (`X-Cache`)
pub const X_CACHE: &str = "x-cache";

/// Output of a handler computation
#[derive(Debug, Clone)]
pub enum Fresh {
    /// Store and serve
    Cache(Value),
    /// Serve without storing (degraded or error payloads)
    NoStore(Value),
}

impl Fresh {
    pub fn cache(value: impl serde::Serialize) -> AppResult<Self> {
        Ok(Fresh::Cache(to_value(value)?))
    }

    pub fn no_store(value: impl serde::Serialize) -> AppResult<Self> {
        Ok(Fresh::NoStore(to_value(value)?))
    }
}

fn to_value(value: impl serde::Serialize) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| crate::error::AppError::Internal(format!("Failed to encode payload: {}", e)))
}

/// Serve `endpoint` from the cache or from `compute`
pub async fn cached_json<F, Fut>(
    state: &Arc<AppState>,
    endpoint: &'static str,
    params: Vec<(String, String)>,
    compute: F,
) -> AppResult<Response>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<Fresh>>,
{
    let cache = state.cache.clone();
    let lookup_params = params.clone();
    let hit = tokio::task::spawn_blocking(move || {
        cache.lookup(endpoint, &borrow_params(&lookup_params))
    })
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(endpoint, error = %e, "Cache lookup task failed");
        None
    });

    if let Some(hit) = hit {
        state.metrics.cache_hits.inc();
        return Ok(json_response(hit.data, "HIT", Some(hit.remaining)));
    }
    state.metrics.cache_misses.inc();

    let (data, store) = match compute().await? {
        Fresh::Cache(data) => (sanitize_output(data), true),
        Fresh::NoStore(data) => (sanitize_output(data), false),
    };

    if !store {
        return Ok(json_response(data, "MISS", None));
    }

    let cache = state.cache.clone();
    let stored = data.clone();
    let written = tokio::task::spawn_blocking(move || {
        cache.set(endpoint, &stored, &borrow_params(&params))
    })
    .await
    .unwrap_or(false);
    if !written {
        state.metrics.cache_write_failures.inc();
        tracing::warn!(endpoint, "Response not cached");
    }

    Ok(json_response(data, "MISS", Some(state.cache.ttl_for(endpoint))))
}

fn borrow_params(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn json_response(data: Value, cache_status: &'static str, max_age: Option<Duration>) -> Response {
    let cache_control = match max_age {
        Some(age) => format!("private, max-age={}", age.as_secs()),
        None => "no-store".to_string(),
    };

    let mut response = Json(data).into_response();
    let headers = response.headers_mut();
    headers.insert(X_CACHE, HeaderValue::from_static(cache_status));
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}
