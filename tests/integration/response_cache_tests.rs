//! Response Cache Integration Tests
//!
//! Exercises the cache facade against a real directory:
//! - TTL expiry on logical time
//! - Key determinism across parameter order
//! - Clear idempotence and isolation
//! - Corrupt entry tolerance

use dashboard_api::cache::{CacheKey, ManualClock, ResponseCache};
use dashboard_api::config::CacheConfig;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn setup(start: i64) -> (ResponseCache, Arc<ManualClock>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        dir: temp_dir.path().join("api"),
        ..CacheConfig::default()
    };
    let clock = Arc::new(ManualClock::new(start));
    let cache = ResponseCache::with_clock(&config, clock.clone());
    (cache, clock, temp_dir)
}

#[test]
fn test_services_status_lifecycle() {
    let (cache, clock, _dir) = setup(0);
    let online = json!({"nginx": "online"});

    assert!(cache.set("/services/status", &online, &[]));

    clock.set(10);
    assert_eq!(cache.get("/services/status", &[]), Some(online.clone()));

    clock.set(16);
    assert_eq!(cache.get("/services/status", &[]), None);
    // The expired file was removed by the read
    assert!(cache.store().is_empty());

    clock.set(17);
    let fresh = json!({"nginx": "offline"});
    assert!(cache.set("/services/status", &fresh, &[]));
    assert_eq!(cache.get("/services/status", &[]), Some(fresh));
}

#[test]
fn test_every_endpoint_respects_its_ttl() {
    let (cache, clock, _dir) = setup(1_000);
    let endpoints = ["/system/info", "/sites", "/cache/status", "/unlisted"];

    for endpoint in endpoints {
        clock.set(1_000);
        assert!(cache.set(endpoint, &json!(endpoint), &[]));
        assert_eq!(cache.get(endpoint, &[]), Some(json!(endpoint)));

        let ttl = cache.ttl_for(endpoint).as_secs() as i64;
        clock.set(1_000 + ttl);
        assert!(cache.get(endpoint, &[]).is_some(), "{} fresh at its ttl", endpoint);
        clock.set(1_000 + ttl + 1);
        assert!(cache.get(endpoint, &[]).is_none(), "{} stale after its ttl", endpoint);
    }
}

#[test]
fn test_lookup_reports_remaining_validity() {
    let (cache, clock, _dir) = setup(500);
    cache.set("/sites", &json!([]), &[]);
    clock.advance(100);

    let hit = cache.lookup("/sites", &[]).unwrap();
    assert_eq!(hit.created_at, 500);
    assert_eq!(hit.ttl.as_secs(), 120);
    assert_eq!(hit.remaining.as_secs(), 20);
}

#[test]
fn test_parameter_order_hits_same_entry() {
    let (cache, _clock, _dir) = setup(0);
    cache.set("/external-services/feed", &json!("x"), &[("b", "2"), ("a", "1")]);

    assert_eq!(
        cache.get("/external-services/feed", &[("a", "1"), ("b", "2")]),
        Some(json!("x"))
    );
    assert_eq!(cache.get("/external-services/feed", &[("a", "1")]), None);
    assert_eq!(cache.store().len(), 1);
}

#[test]
fn test_clear_is_idempotent() {
    let (cache, _clock, _dir) = setup(0);
    assert_eq!(cache.clear(Some("/sites")), 0);

    cache.set("/sites", &json!([1]), &[]);
    assert_eq!(cache.clear(Some("/sites")), 1);
    assert_eq!(cache.clear(Some("/sites")), 0);
    assert_eq!(cache.clear(None), 0);
}

#[test]
fn test_clear_isolation() {
    let (cache, _clock, _dir) = setup(0);
    cache.set("/sites", &json!("a"), &[]);
    cache.set("/sites", &json!("a2"), &[("page", "2")]);
    cache.set("/sites/count", &json!("b"), &[]);
    cache.set("/system/info", &json!("c"), &[]);

    assert_eq!(cache.clear(Some("/sites")), 2);
    assert_eq!(cache.get("/sites", &[]), None);
    assert_eq!(cache.get("/sites", &[("page", "2")]), None);
    assert_eq!(cache.get("/sites/count", &[]), Some(json!("b")));
    assert_eq!(cache.get("/system/info", &[]), Some(json!("c")));

    assert_eq!(cache.clear(None), 2);
    assert!(cache.store().is_empty());
}

#[test]
fn test_corrupt_entry_is_a_miss_and_removed() {
    let (cache, _clock, _dir) = setup(0);
    cache.set("/system/info", &json!({"os": "x"}), &[]);

    let path = cache.store().path_for(&CacheKey::derive("/system/info", &[]));
    std::fs::write(&path, b"{\"timestamp\": 12, \"data\": ").unwrap();

    assert_eq!(cache.get("/system/info", &[]), None);
    assert!(!path.exists());
}

#[test]
fn test_unwritable_directory_degrades_to_miss() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let config = CacheConfig {
        dir: blocker.join("api"),
        ..CacheConfig::default()
    };
    let cache = ResponseCache::with_clock(&config, Arc::new(ManualClock::new(0)));

    assert!(!cache.set("/sites", &json!([]), &[]));
    assert_eq!(cache.get("/sites", &[]), None);
    assert_eq!(cache.clear(None), 0);
}

#[test]
fn test_entries_written_by_older_deployments() {
    let (cache, clock, _dir) = setup(100);
    std::fs::create_dir_all(cache.store().dir()).unwrap();
    let path = cache.store().path_for(&CacheKey::derive("/sites/count", &[]));
    std::fs::write(&path, br#"{"timestamp": 100, "data": {"count": 4}}"#).unwrap();

    clock.set(150);
    assert_eq!(cache.get("/sites/count", &[]), Some(json!({"count": 4})));
}
