//! Recent activity and resource alerts

use axum::{extract::State, response::Response};
use std::sync::Arc;

use super::{cached_json, AppState, Fresh};
use crate::error::AppResult;

/// GET /api/activity/recent
pub async fn recent_activity(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/activity/recent", Vec::new(), || async {
        Fresh::cache(state.host_health.recent_activity().await)
    })
    .await
}

/// GET /api/alerts
pub async fn system_alerts(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/alerts", Vec::new(), || async {
        Fresh::cache(state.host_health.alerts().await)
    })
    .await
}
