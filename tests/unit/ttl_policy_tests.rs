//! TTL Policy Unit Tests
//!
//! Tests freshness lookup and the shared expiry predicate.

use dashboard_api::cache::{CacheEntry, TtlPolicy};
use dashboard_api::config::CacheConfig;
use serde_json::json;
use std::time::Duration;

fn entry(endpoint: &str, created_at: i64) -> CacheEntry {
    CacheEntry {
        created_at,
        endpoint: endpoint.to_string(),
        data: json!(null),
    }
}

#[test]
fn test_reference_table() {
    let policy = TtlPolicy::reference();
    assert_eq!(policy.ttl_for("/services/status"), Duration::from_secs(15));
    assert_eq!(policy.ttl_for("/system/info"), Duration::from_secs(60));
    assert_eq!(policy.ttl_for("/not/listed"), Duration::from_secs(30));
}

#[test]
fn test_expiry_boundary_is_exclusive() {
    let policy = TtlPolicy::reference();
    let e = entry("/services/status", 0);
    assert!(!policy.is_expired(&e, 15));
    assert!(policy.is_expired(&e, 16));
}

#[test]
fn test_future_timestamp_counts_as_fresh() {
    let policy = TtlPolicy::reference();
    let e = entry("/services/status", 1_000);
    assert!(!policy.is_expired(&e, 900));
    assert_eq!(policy.remaining(&e, 900), Duration::from_secs(15));
}

#[test]
fn test_remaining_saturates() {
    let policy = TtlPolicy::reference();
    let e = entry("/services/status", 0);
    assert_eq!(policy.remaining(&e, 10), Duration::from_secs(5));
    assert_eq!(policy.remaining(&e, 100), Duration::ZERO);
}

#[test]
fn test_config_overrides() {
    let mut config = CacheConfig {
        default_ttl_secs: 45,
        ..CacheConfig::default()
    };
    config.ttl_overrides.insert("/services/status".to_string(), 5);

    let policy = TtlPolicy::from_config(&config);
    assert_eq!(policy.ttl_for("/services/status"), Duration::from_secs(5));
    assert_eq!(policy.ttl_for("/sites"), Duration::from_secs(120));
    assert_eq!(policy.ttl_for("/anything"), Duration::from_secs(45));
}
