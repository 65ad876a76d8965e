//! Third-party status endpoints

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{cached_json, AppState, Fresh};
use crate::error::{AppError, AppResult};
use crate::upstream::FeedStatus;
use crate::validation::{log_security_event, validate_string};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub feed: Option<String>,
}

/// GET /api/external-services/config
///
/// Services the dashboard should render, as `{ name: true }`.
pub async fn external_services_config(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/external-services/config", Vec::new(), || async {
        let services: Map<String, Value> = state
            .config
            .external_services
            .services
            .iter()
            .map(|name| (name.clone(), Value::Bool(true)))
            .collect();
        Fresh::cache(services)
    })
    .await
}

/// GET /api/external-services/feed?feed=<name>
pub async fn external_service_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Response> {
    let feed = query
        .feed
        .as_deref()
        .and_then(|f| validate_string(f, 50))
        .ok_or_else(|| AppError::Validation("Feed parameter required".to_string()))?
        .to_ascii_lowercase();

    if !state.status_pages.knows(&feed) {
        log_security_event("Unknown status feed requested", &feed, None);
        return Err(AppError::Validation("Unknown status feed".to_string()));
    }

    let params = vec![("feed".to_string(), feed.clone())];
    cached_json(&state, "/external-services/feed", params, || async {
        match state.status_pages.status(&feed).await {
            Ok(status) => Fresh::cache(json!({ "status": status })),
            Err(AppError::Upstream(reason)) => {
                tracing::warn!(feed = %feed, reason = %reason, "Status feed unavailable");
                Fresh::no_store(json!({ "status": FeedStatus::unreachable() }))
            }
            Err(e) => Err(e),
        }
    })
    .await
}
