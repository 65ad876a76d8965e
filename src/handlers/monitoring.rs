//! Uptime Robot endpoints
//!
//! A missing API key is a normal state and is cached like any payload. A
//! failing upstream is reported in the body but never cached, so the next
//! request tries again.

use axum::{extract::State, response::Response};
use serde_json::json;
use std::sync::Arc;

use super::{cached_json, AppState, Fresh};
use crate::error::AppResult;
use crate::upstream::{MonitorList, UptimeSummary};

const NOT_CONFIGURED: &str = "UptimeRobot API not configured";
const FETCH_FAILED: &str = "Failed to fetch monitors from UptimeRobot API";

/// GET /api/monitoring/uptime
pub async fn uptime_status(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/monitoring/uptime", Vec::new(), || async {
        let Some(client) = state.uptime_robot.as_ref() else {
            return Fresh::cache(json!({ "enabled": false, "reason": NOT_CONFIGURED }));
        };

        match client.monitors().await {
            Ok(monitors) => Fresh::cache(UptimeSummary::from_monitors(&monitors)),
            Err(e) => {
                tracing::warn!(error = %e, "Uptime Robot status unavailable");
                Fresh::no_store(json!({ "enabled": true, "error": FETCH_FAILED }))
            }
        }
    })
    .await
}

/// GET /api/monitoring/uptime/monitors
pub async fn uptime_monitors(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    cached_json(&state, "/monitoring/uptime/monitors", Vec::new(), || async {
        let Some(client) = state.uptime_robot.as_ref() else {
            return Fresh::cache(json!({
                "enabled": false,
                "reason": NOT_CONFIGURED,
                "monitors": [],
            }));
        };

        match client.monitors().await {
            Ok(monitors) => Fresh::cache(MonitorList::from_monitors(&monitors)),
            Err(e) => {
                tracing::warn!(error = %e, "Uptime Robot monitors unavailable");
                Fresh::no_store(json!({
                    "enabled": true,
                    "error": FETCH_FAILED,
                    "monitors": [],
                }))
            }
        }
    })
    .await
}
