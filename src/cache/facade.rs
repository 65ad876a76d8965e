//! Response cache used by endpoint handlers
//!
//! Wraps the store, TTL policy and sweeper behind the operations handlers
//! need: look up a fresh payload, store a computed one, invalidate an
//! endpoint and opportunistically sweep. No operation here fails a request:
//! a broken cache behaves like an empty one.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore, Slot};
use super::sweeper::{CacheSweeper, SweepOutcome};
use super::ttl::TtlPolicy;
use crate::config::CacheConfig;

/// A fresh cached payload and its validity window
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub data: Value,
    pub created_at: i64,
    pub ttl: Duration,
    /// Validity left at lookup time
    pub remaining: Duration,
}

/// Snapshot of cache state for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub dir: String,
    pub entries: usize,
    pub default_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub last_sweep_at: Option<i64>,
    pub sweep_passes: u64,
}

/// Filesystem response cache shared by all handlers
pub struct ResponseCache {
    store: CacheStore,
    policy: Arc<TtlPolicy>,
    clock: Arc<dyn Clock>,
    sweeper: CacheSweeper,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let store = CacheStore::new(&config.dir);
        let policy = Arc::new(TtlPolicy::from_config(config));
        let sweeper = CacheSweeper::new(
            store.clone(),
            policy.clone(),
            clock.clone(),
            Duration::from_secs(config.sweep_interval_secs),
            config.sweep_max_deletions,
        );

        Self {
            store,
            policy,
            clock,
            sweeper,
        }
    }

    /// Fresh payload for `endpoint` and `params`, if any
    pub fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Option<Value> {
        self.lookup(endpoint, params).map(|hit| hit.data)
    }

    /// Fresh payload plus freshness details for response headers
    pub fn lookup(&self, endpoint: &str, params: &[(&str, &str)]) -> Option<CacheHit> {
        let key = CacheKey::derive(endpoint, params);

        let mut entry = match self.store.inspect(&key) {
            Slot::Present(entry) => entry,
            Slot::Absent => {
                tracing::trace!(endpoint, key = %key, "Cache miss");
                return None;
            }
            Slot::Corrupt => {
                tracing::debug!(endpoint, key = %key, "Discarding corrupt cache entry");
                self.store.delete(&key);
                return None;
            }
        };

        if entry.endpoint.is_empty() {
            entry.endpoint = endpoint.to_string();
        } else if entry.endpoint != endpoint {
            // Another endpoint sanitized to the same key; its entry stays.
            tracing::debug!(
                endpoint,
                stored_endpoint = %entry.endpoint,
                key = %key,
                "Cache key collision"
            );
            return None;
        }

        let now = self.clock.now();
        if self.policy.is_expired(&entry, now) {
            tracing::trace!(endpoint, age_secs = self.policy.age(&entry, now), "Cache entry expired");
            self.store.delete(&key);
            return None;
        }

        tracing::trace!(endpoint, age_secs = self.policy.age(&entry, now), "Cache hit");
        Some(CacheHit {
            ttl: self.policy.ttl_for(endpoint),
            remaining: self.policy.remaining(&entry, now),
            created_at: entry.created_at,
            data: entry.data,
        })
    }

    /// Store `data` for `endpoint` and `params`, stamped with the current time
    pub fn set(&self, endpoint: &str, data: &Value, params: &[(&str, &str)]) -> bool {
        let key = CacheKey::derive(endpoint, params);
        let entry = CacheEntry {
            created_at: self.clock.now(),
            endpoint: endpoint.to_string(),
            data: data.clone(),
        };
        self.store.write(&key, &entry)
    }

    /// Remove cached entries and return how many files were deleted
    ///
    /// `None` clears everything. `Some(endpoint)` clears the endpoint and
    /// all of its parameterized variants, leaving other endpoints alone.
    pub fn clear(&self, endpoint: Option<&str>) -> usize {
        let removed = match endpoint {
            None => self
                .store
                .list_all()
                .filter(|key| self.store.delete(key))
                .count(),
            Some(endpoint) => self
                .store
                .list_all()
                .filter(|key| key.matches_endpoint(endpoint))
                .filter(|key| match self.store.inspect(key) {
                    Slot::Present(entry) => entry.endpoint.is_empty() || entry.endpoint == endpoint,
                    Slot::Corrupt => true,
                    Slot::Absent => false,
                })
                .filter(|key| self.store.delete(key))
                .count(),
        };

        tracing::debug!(endpoint = endpoint.unwrap_or("*"), removed, "Cache cleared");
        removed
    }

    /// Run a sweep pass if one is due; never fails
    pub fn trigger_sweep(&self) -> SweepOutcome {
        self.sweeper.run()
    }

    pub fn ttl_for(&self, endpoint: &str) -> Duration {
        self.policy.ttl_for(endpoint)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            dir: self.store.dir().display().to_string(),
            entries: self.store.len(),
            default_ttl_secs: self.policy.default_ttl().as_secs(),
            sweep_interval_secs: self.sweeper.interval().as_secs(),
            last_sweep_at: self.sweeper.last_sweep_at(),
            sweep_passes: self.sweeper.passes(),
        }
    }

    pub fn sweeper(&self) -> &CacheSweeper {
        &self.sweeper
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}
