//! API Integration Tests
//!
//! Drives the router end to end with a stubbed command runner:
//! - Cache-aside behavior and the X-Cache header
//! - CSRF protection on state-changing requests
//! - Query validation
//! - Batched reads sharing the per-endpoint cache
//! - Resource alerts and recent activity
//! - Root health and security headers

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use dashboard_api::config::AppConfig;
use dashboard_api::handlers::X_CACHE;
use dashboard_api::{api_router, build_router, AppState, CommandOutput, CommandRunner};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Answers like a healthy host and counts invocations
#[derive(Default)]
struct StubRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl CommandRunner for StubRunner {
    async fn execute(&self, program: &str, args: &[&str]) -> Option<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = match (program, args.first().copied()) {
            ("systemctl", Some("status")) => "Active: active (running) since Mon",
            ("systemctl", Some("list-units")) => {
                "php8.3-fpm.service loaded active running The PHP 8.3 FastCGI Process Manager"
            }
            ("nginx", _) => "nginx version: nginx/1.27.3",
            ("php", _) => "PHP 8.3.14 (cli) (built: Nov 25 2024)",
            ("mariadb", _) => "mariadb from 11.4.4-MariaDB, client 15.2",
            ("redis-server", _) => "Redis server v=7.4.1 sha=00000000:0",
            ("redis-cli", Some("FLUSHALL")) => "OK",
            _ => return None,
        };
        Some(CommandOutput {
            success: true,
            text: text.to_string(),
        })
    }
}

struct TestApp {
    state: Arc<AppState>,
    runner: Arc<StubRunner>,
    _dir: TempDir,
}

fn setup() -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.cache.dir = dir.path().join("api");
    config.security.csrf_secret = "integration-secret".to_string();
    config.probes.nginx_sites_dir = dir.path().join("sites-enabled");
    config.probes.fastcgi_cache_dir = dir.path().join("fcgi");
    config.uptime_robot.api_key = None;
    config.uptime_robot.config_file = dir.path().join("uptimerobot.conf");
    config.probes.meminfo_path = dir.path().join("meminfo");
    config.probes.auth_log_path = dir.path().join("auth.log");
    std::fs::write(
        &config.probes.meminfo_path,
        "MemTotal:       4000000 kB\nMemAvailable:    200000 kB\n",
    )
    .unwrap();
    std::fs::create_dir_all(&config.cache.dir).unwrap();

    let runner = Arc::new(StubRunner::default());
    let state = Arc::new(AppState::with_runner(config, runner.clone()).unwrap());
    TestApp {
        state,
        runner,
        _dir: dir,
    }
}

fn api(app: &TestApp) -> Router {
    Router::new().nest("/api", api_router(app.state.clone()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_services_status_is_cached() {
    let app = setup();

    let first = api(&app).oneshot(get("/api/services/status")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[X_CACHE], "MISS");
    assert_eq!(first.headers()[header::CACHE_CONTROL], "private, max-age=15");
    let calls_after_miss = app.runner.calls.load(Ordering::SeqCst);
    assert!(calls_after_miss > 0);

    let body = body_json(first).await;
    assert_eq!(body["nginx"]["status"], "online");
    assert_eq!(body["nginx"]["version"], "1.27.3");
    assert_eq!(body["php"]["version"], "8.3.14");

    let second = api(&app).oneshot(get("/api/services/status")).await.unwrap();
    assert_eq!(second.headers()[X_CACHE], "HIT");
    assert_eq!(body_json(second).await, body);
    assert_eq!(app.runner.calls.load(Ordering::SeqCst), calls_after_miss);

    assert_eq!(app.state.metrics.cache_hits.get(), 1);
    assert_eq!(app.state.metrics.cache_misses.get(), 1);
}

#[tokio::test]
async fn test_cache_clear_requires_csrf_token() {
    let app = setup();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/cache/clear?type=api")
        .body(Body::empty())
        .unwrap();
    let response = api(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/cache/clear?type=api")
        .header("X-CSRF-Token", "1700000000.00.00")
        .body(Body::empty())
        .unwrap();
    let response = api(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cache_clear_with_token() {
    let app = setup();

    // Warm two entries
    api(&app).oneshot(get("/api/services/status")).await.unwrap();
    api(&app).oneshot(get("/api/sites/count")).await.unwrap();
    assert_eq!(app.state.cache.store().len(), 2);

    let token_response = api(&app).oneshot(get("/api/csrf-token")).await.unwrap();
    assert_eq!(token_response.headers()[header::CACHE_CONTROL], "no-store");
    let token_body = body_json(token_response).await;
    assert_eq!(token_body["token_name"], "_csrf_token");
    let token = token_body["csrf_token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/cache/clear?type=api,bogus,redis")
        .header("X-CSRF-Token", &token)
        .body(Body::empty())
        .unwrap();
    let response = api(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["cleared"], serde_json::json!(["api", "redis"]));
    assert_eq!(body["results"]["redis"]["success"], true);
    assert_eq!(body["warnings"]["invalid_types"], serde_json::json!(["bogus"]));
    assert!(app.state.cache.store().is_empty());
}

#[tokio::test]
async fn test_cache_clear_rejects_missing_and_invalid_types() {
    let app = setup();
    let token = app.state.csrf.issue();

    for uri in ["/api/cache/clear", "/api/cache/clear?type=opcache", "/api/cache/clear?type=api&endpoint=../etc"] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("X-CSRF-Token", &token)
            .body(Body::empty())
            .unwrap();
        let response = api(&app).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_unknown_feed_is_rejected() {
    let app = setup();

    let response = api(&app)
        .oneshot(get("/api/external-services/feed?feed=nosuchservice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = api(&app)
        .oneshot(get("/api/external-services/feed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.state.cache.store().is_empty());
}

#[tokio::test]
async fn test_uptime_without_api_key() {
    let app = setup();

    let response = api(&app).oneshot(get("/api/monitoring/uptime")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enabled"], false);

    let response = api(&app)
        .oneshot(get("/api/monitoring/uptime/monitors"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["monitors"], serde_json::json!([]));
}

#[tokio::test]
async fn test_full_router_health_and_headers() {
    let app = setup();
    let router = build_router(app.state.clone()).unwrap();

    let mut request = get("/health");
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert!(response.headers().contains_key("x-request-id"));

    let mut request = get("/api/health");
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40001))));
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"]["available"], true);
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-CSRF-Token", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_batch_shares_endpoint_cache() {
    let app = setup();
    let token = app.state.csrf.issue();
    let requests = serde_json::json!({
        "requests": ["/services/status", "/sites/count", "/cache/status", "/services/status", 5]
    });

    let response = api(&app)
        .oneshot(post_json("/api/batch", &token, requests.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["cached_count"], 0);
    assert_eq!(body["results"]["/services/status"]["nginx"]["status"], "online");
    assert_eq!(body["results"]["/sites/count"]["count"], 0);
    assert_eq!(
        body["errors"]["/cache/status"],
        "Endpoint not allowed in batch requests"
    );
    assert_eq!(body["errors"]["5"], "Invalid endpoint type");
    assert!(body["results"].get("/cache/status").is_none());

    // A direct read now hits the entry the batch stored
    let direct = api(&app).oneshot(get("/api/sites/count")).await.unwrap();
    assert_eq!(direct.headers()[X_CACHE], "HIT");

    let response = api(&app)
        .oneshot(post_json("/api/batch", &token, requests))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["cached_count"], 2);
}

#[tokio::test]
async fn test_batch_rejects_bad_requests() {
    let app = setup();
    let token = app.state.csrf.issue();

    let oversized = serde_json::json!({ "requests": vec!["/sites"; 11] });
    let response = api(&app)
        .oneshot(post_json("/api/batch", &token, oversized))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let missing = serde_json::json!({ "endpoints": ["/sites"] });
    let response = api(&app)
        .oneshot(post_json("/api/batch", &token, missing))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/batch")
        .header("X-CSRF-Token", &token)
        .body(Body::from("not json"))
        .unwrap();
    let response = api(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unsigned = Request::builder()
        .method(Method::POST)
        .uri("/api/batch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"requests": ["/sites"]}"#))
        .unwrap();
    let response = api(&app).oneshot(unsigned).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_alerts_and_recent_activity() {
    let app = setup();

    let response = api(&app).oneshot(get("/api/alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[X_CACHE], "MISS");
    let body = body_json(response).await;
    // 95% of memory in use; disk usage unavailable from the stub
    assert_eq!(
        body,
        serde_json::json!([
            {"message": "High memory usage detected", "time": "Now", "type": "warning"}
        ])
    );

    let response = api(&app).oneshot(get("/api/activity/recent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["message"], "System status updated");
    assert_eq!(body.as_array().unwrap().len(), 1);
}
