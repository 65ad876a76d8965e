//! Host endpoints: system identity, service states, sites and tools

use axum::{extract::State, response::Response};
use serde_json::json;
use std::sync::Arc;

use super::{cached_json, AppState, Fresh};
use crate::error::AppResult;

/// GET /api/system/info
pub async fn system_info(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/system/info", Vec::new(), || async {
        Fresh::cache(state.system.info().await)
    })
    .await
}

/// GET /api/services/status
pub async fn services_status(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/services/status", Vec::new(), || async {
        Fresh::cache(state.services.report().await)
    })
    .await
}

/// GET /api/sites
pub async fn sites_list(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/sites", Vec::new(), || async {
        Fresh::cache(state.sites.sites().await)
    })
    .await
}

/// GET /api/sites/count
pub async fn sites_count(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/sites/count", Vec::new(), || async {
        let count = state.sites.sites().await.len();
        Fresh::cache(json!({ "count": count }))
    })
    .await
}

/// GET /api/tools/filemanager/status
pub async fn filemanager_status(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/tools/filemanager/status", Vec::new(), || async {
        let probe = state.file_manager.clone();
        let status = tokio::task::spawn_blocking(move || probe.status())
            .await
            .map_err(|e| crate::error::AppError::Internal(format!("File manager probe failed: {}", e)))?;
        Fresh::cache(status)
    })
    .await
}
