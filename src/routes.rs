//! Router assembly

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::metrics::metrics_router;
use crate::middleware::{self, ClientIpKeyExtractor};

/// `X-CSRF-Token`, lowercased as `HeaderName` requires
const CSRF_HEADER_LOWER: &str = "x-csrf-token";

/// Routes served under `/api`
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/csrf-token", get(handlers::csrf_token))
        .route("/system/info", get(handlers::system_info))
        .route("/services/status", get(handlers::services_status))
        .route("/sites", get(handlers::sites_list))
        .route("/sites/count", get(handlers::sites_count))
        .route("/tools/filemanager/status", get(handlers::filemanager_status))
        .route("/monitoring/uptime", get(handlers::uptime_status))
        .route("/monitoring/uptime/monitors", get(handlers::uptime_monitors))
        .route("/external-services/config", get(handlers::external_services_config))
        .route("/external-services/feed", get(handlers::external_service_feed))
        .route("/cache/status", get(handlers::cache_status))
        .route("/cache/clear", post(handlers::cache_clear))
        .route("/activity/recent", get(handlers::recent_activity))
        .route("/alerts", get(handlers::system_alerts))
        .route("/batch", post(handlers::batch))
        .layer(axum_middleware::from_fn_with_state(
            state.csrf.clone(),
            middleware::csrf_protect,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::sweep_after_request,
        ))
        .with_state(state)
}

/// Full application router with rate limiting, CORS and security headers
///
/// Rate limiting keys on the peer address, so serve with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(state: Arc<AppState>) -> AppResult<Router> {
    let security = &state.config.security;
    let server = state.config.server.clone();

    // Replenish one request every window/budget, allowing a full budget burst
    let replenish_ms =
        (security.rate_limit_window_secs * 1000 / u64::from(security.rate_limit_requests)).max(1);
    let rate_limit_config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(security.trust_forwarded_headers))
        .per_millisecond(replenish_ms)
        .burst_size(security.rate_limit_requests)
        .finish()
        .ok_or_else(|| AppError::Internal("Invalid rate limit configuration".to_string()))?;

    tracing::info!(
        requests = security.rate_limit_requests,
        window_secs = security.rate_limit_window_secs,
        trust_forwarded_headers = security.trust_forwarded_headers,
        "Rate limiting configured"
    );

    let origins: Vec<HeaderValue> = security
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER_LOWER)])
        .max_age(Duration::from_secs(3600));

    let root_routes = Router::new()
        .route("/health", get(handlers::health_simple))
        .merge(metrics_router().with_state(state.metrics.clone()));

    let app = Router::new()
        .nest("/api", api_router(state))
        .merge(root_routes)
        .layer(request_timeout_layer(&server))
        .layer(GovernorLayer {
            config: Arc::new(rate_limit_config),
        })
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(app)
}

/// Answers `408 Request Timeout` when a request outlives `request_timeout_ms`
pub fn request_timeout_layer(server: &ServerConfig) -> TimeoutLayer {
    TimeoutLayer::new(Duration::from_millis(server.request_timeout_ms))
}
