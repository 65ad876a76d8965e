//! Opportunistic cache sweeping driven by request traffic
//!
//! There is no scheduler: every API request hands the sweeper a chance to
//! run after the response is produced. The sweeper throttles itself, so most
//! of these calls end at the lock file.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::handlers::AppState;

pub async fn sweep_after_request(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let cache = state.cache.clone();
    let metrics = state.metrics.clone();
    // Detached: the response never waits on the sweep
    tokio::task::spawn_blocking(move || {
        let outcome = cache.trigger_sweep();
        metrics.record_sweep(&outcome);
    });

    response
}
