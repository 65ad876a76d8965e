//! Batched reads of several cached endpoints in one request
//!
//! `POST /api/batch` with `{"requests": ["/system/info", ...]}` answers
//! `{"results": {endpoint: payload}, "errors": {endpoint: reason},
//! "cached_count": n}`. Each endpoint is served by its regular handler, so
//! batched and direct reads share cache entries.

use axum::{
    body::to_bytes,
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::{AppState, X_CACHE};
use crate::error::{AppError, AppResult};
use crate::validation::log_security_event;

/// Endpoints that may appear in a batch
pub const BATCH_ENDPOINTS: &[&str] = &[
    "/system/info",
    "/services/status",
    "/sites",
    "/sites/count",
    "/tools/filemanager/status",
    "/monitoring/uptime",
    "/monitoring/uptime/monitors",
];

/// Largest accepted `requests` array
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Default, Serialize)]
pub struct BatchResponse {
    pub results: BTreeMap<String, Value>,
    pub errors: BTreeMap<String, String>,
    pub cached_count: usize,
}

/// POST /api/batch
pub async fn batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<BatchResponse>> {
    let invalid = || AppError::Validation("Expected JSON with a \"requests\" array".to_string());
    let Json(body) = body.map_err(|_| invalid())?;
    let requests = body
        .get("requests")
        .and_then(Value::as_array)
        .ok_or_else(invalid)?;

    if requests.len() > MAX_BATCH_SIZE {
        return Err(AppError::Validation(format!(
            "Batch size exceeds maximum of {} requests",
            MAX_BATCH_SIZE
        )));
    }

    let mut response = BatchResponse::default();
    let mut tasks = JoinSet::new();
    let mut scheduled: Vec<&'static str> = Vec::new();

    for request in requests {
        let Some(raw) = request.as_str() else {
            response
                .errors
                .insert(request.to_string(), "Invalid endpoint type".to_string());
            continue;
        };

        let Some(endpoint) = allowed_endpoint(raw) else {
            log_security_event("Batch endpoint not allowed", raw, None);
            response.errors.insert(
                raw.to_string(),
                "Endpoint not allowed in batch requests".to_string(),
            );
            continue;
        };

        if !scheduled.contains(&endpoint) {
            scheduled.push(endpoint);
            let state = state.clone();
            tasks.spawn(async move { (endpoint, run(state, endpoint).await) });
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((endpoint, Ok((payload, hit)))) => {
                if hit {
                    response.cached_count += 1;
                }
                response.results.insert(endpoint.to_string(), payload);
            }
            Ok((endpoint, Err(e))) => {
                tracing::warn!(endpoint, error = %e, "Batch endpoint failed");
                response
                    .errors
                    .insert(endpoint.to_string(), "Failed to process endpoint".to_string());
            }
            Err(e) => tracing::error!(error = %e, "Batch task failed"),
        }
    }

    Ok(Json(response))
}

/// Allow-listed endpoint named by `raw`, after dropping unexpected characters
pub fn allowed_endpoint(raw: &str) -> Option<&'static str> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
        .collect();
    BATCH_ENDPOINTS.iter().copied().find(|e| *e == clean)
}

/// Serve one endpoint through its handler; the payload and whether it was a cache hit
async fn run(state: Arc<AppState>, endpoint: &'static str) -> AppResult<(Value, bool)> {
    let handler_state = State(state);
    let response = match endpoint {
        "/system/info" => super::system_info(handler_state).await?,
        "/services/status" => super::services_status(handler_state).await?,
        "/sites" => super::sites_list(handler_state).await?,
        "/sites/count" => super::sites_count(handler_state).await?,
        "/tools/filemanager/status" => super::filemanager_status(handler_state).await?,
        "/monitoring/uptime" => super::uptime_status(handler_state).await?,
        "/monitoring/uptime/monitors" => super::uptime_monitors(handler_state).await?,
        other => return Err(AppError::NotFound(format!("No batch handler for {}", other))),
    };
    payload(response).await
}

async fn payload(response: Response) -> AppResult<(Value, bool)> {
    if !response.status().is_success() {
        return Err(AppError::Internal(format!(
            "Handler answered {}",
            response.status()
        )));
    }

    let hit = response
        .headers()
        .get(X_CACHE)
        .is_some_and(|v| v.as_bytes() == b"HIT");
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read handler body: {}", e)))?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Internal(format!("Handler body is not JSON: {}", e)))?;
    Ok((value, hit))
}
