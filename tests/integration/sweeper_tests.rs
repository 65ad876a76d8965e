//! Cache Sweeper Integration Tests
//!
//! Tests the lock-protected sweep protocol:
//! - Concurrent triggers in one interval produce exactly one pass
//! - A lock held by another handle makes the sweep a no-op
//! - The per-pass deletion cap leaves the remainder for the next due pass
//! - Fresh entries survive, corrupt ones do not

use dashboard_api::cache::{
    CacheEntry, CacheKey, CacheStore, ManualClock, ResponseCache, SweepOutcome,
};
use dashboard_api::config::CacheConfig;
use serde_json::json;
use std::fs::OpenOptions;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn setup(start: i64, max_deletions: usize) -> (Arc<ResponseCache>, Arc<ManualClock>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        dir: temp_dir.path().to_path_buf(),
        sweep_interval_secs: 60,
        sweep_max_deletions: max_deletions,
        ..CacheConfig::default()
    };
    let clock = Arc::new(ManualClock::new(start));
    let cache = Arc::new(ResponseCache::with_clock(&config, clock.clone()));
    (cache, clock, temp_dir)
}

fn seed(store: &CacheStore, count: usize, endpoint: &str, created_at: i64) {
    for i in 0..count {
        let page = i.to_string();
        let key = CacheKey::derive(endpoint, &[("page", page.as_str())]);
        let entry = CacheEntry {
            created_at,
            endpoint: endpoint.to_string(),
            data: json!(i),
        };
        assert!(store.write(&key, &entry));
    }
}

#[test]
fn test_concurrent_triggers_sweep_once() {
    let (cache, _clock, _dir) = setup(10_000, 200);
    seed(cache.store(), 20, "/services/status", 0);

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let cache = cache.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                cache.trigger_sweep()
            })
        })
        .collect();

    let outcomes: Vec<SweepOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, SweepOutcome::Completed(_)))
        .count();

    assert_eq!(completed, 1, "outcomes: {:?}", outcomes);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, SweepOutcome::Completed(_) | SweepOutcome::Contended | SweepOutcome::NotDue)));
    assert_eq!(cache.sweeper().passes(), 1);
    assert!(cache.store().is_empty());
}

#[test]
fn test_held_lock_makes_sweep_a_noop() {
    let (cache, _clock, _dir) = setup(10_000, 200);
    seed(cache.store(), 3, "/sites", 0);

    let holder = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(cache.store().lock_path())
        .unwrap();
    holder.try_lock().unwrap();

    assert_eq!(cache.trigger_sweep(), SweepOutcome::Contended);
    assert_eq!(cache.store().len(), 3);

    holder.unlock().unwrap();
    assert!(matches!(cache.trigger_sweep(), SweepOutcome::Completed(_)));
    assert!(cache.store().is_empty());
}

#[test]
fn test_deletion_cap_spreads_work_over_passes() {
    let (cache, clock, _dir) = setup(10_000, 200);
    seed(cache.store(), 250, "/services/status", 0);

    match cache.trigger_sweep() {
        SweepOutcome::Completed(report) => {
            assert_eq!(report.expired_removed, 200);
            assert!(report.capped);
        }
        other => panic!("expected a completed sweep, got {:?}", other),
    }
    assert_eq!(cache.store().len(), 50);

    // Not due yet: the remainder waits for the interval
    clock.advance(30);
    assert_eq!(cache.trigger_sweep(), SweepOutcome::NotDue);
    assert_eq!(cache.store().len(), 50);

    clock.advance(30);
    match cache.trigger_sweep() {
        SweepOutcome::Completed(report) => {
            assert_eq!(report.expired_removed, 50);
            assert!(!report.capped);
        }
        other => panic!("expected a completed sweep, got {:?}", other),
    }
    assert!(cache.store().is_empty());
    assert_eq!(cache.sweeper().passes(), 2);
}

#[test]
fn test_sweep_keeps_fresh_and_drops_corrupt() {
    let (cache, _clock, dir) = setup(10_000, 200);
    seed(cache.store(), 5, "/services/status", 0);
    seed(cache.store(), 4, "/sites", 9_950);
    std::fs::write(dir.path().join("_garbage.json"), b"not json").unwrap();

    match cache.trigger_sweep() {
        SweepOutcome::Completed(report) => {
            assert_eq!(report.expired_removed, 5);
            assert_eq!(report.corrupt_removed, 1);
            assert_eq!(report.scanned, 10);
        }
        other => panic!("expected a completed sweep, got {:?}", other),
    }
    assert_eq!(cache.store().len(), 4);
    assert_eq!(cache.sweeper().last_sweep_at(), Some(10_000));
}

#[test]
fn test_marker_is_shared_across_instances() {
    let (first, clock, dir) = setup(10_000, 200);
    assert!(matches!(first.trigger_sweep(), SweepOutcome::Completed(_)));

    // A second process sharing the directory sees the marker
    let config = CacheConfig {
        dir: dir.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let second = ResponseCache::with_clock(&config, clock.clone());
    assert_eq!(second.trigger_sweep(), SweepOutcome::NotDue);

    clock.advance(60);
    assert!(matches!(second.trigger_sweep(), SweepOutcome::Completed(_)));
}

#[test]
fn test_missing_directory_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        dir: temp_dir.path().join("never-created"),
        ..CacheConfig::default()
    };
    let cache = ResponseCache::with_clock(&config, Arc::new(ManualClock::new(0)));
    assert_eq!(cache.trigger_sweep(), SweepOutcome::Unavailable);
}
