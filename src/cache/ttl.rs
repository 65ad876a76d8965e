//! Endpoint freshness policy
//!
//! Maps endpoint identifiers to their time-to-live and owns the single
//! expiry predicate shared by cache reads and the sweeper.

use std::collections::HashMap;
use std::time::Duration;

use super::store::CacheEntry;
use crate::config::CacheConfig;

/// TTL applied to endpoints without an explicit entry
pub const DEFAULT_TTL_SECS: u64 = 30;

/// How far in the future an entry may be stamped and still be served
pub const MAX_CLOCK_SKEW_SECS: i64 = 86_400;

/// Built-in per-endpoint TTLs in seconds
pub const REFERENCE_TTLS: &[(&str, u64)] = &[
    ("/system/info", 60),
    ("/services/status", 15),
    ("/sites", 120),
    ("/sites/count", 120),
    ("/tools/filemanager/status", 300),
    ("/monitoring/uptime", 60),
    ("/monitoring/uptime/monitors", 60),
    ("/cache/status", 30),
    ("/external-services/config", 300),
    ("/external-services/feed", 180),
];

/// Endpoint → TTL mapping with a default fallback
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    default_ttl: Duration,
    overrides: HashMap<String, Duration>,
}

impl TtlPolicy {
    /// Policy with no per-endpoint entries
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            overrides: HashMap::new(),
        }
    }

    /// Built-in table with the 30 second default
    pub fn reference() -> Self {
        REFERENCE_TTLS.iter().fold(
            Self::new(Duration::from_secs(DEFAULT_TTL_SECS)),
            |policy, (endpoint, secs)| policy.with_ttl(endpoint, Duration::from_secs(*secs)),
        )
    }

    /// Built-in table merged with configured default and overrides
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut policy = Self::reference();
        policy.default_ttl = Duration::from_secs(config.default_ttl_secs);
        for (endpoint, secs) in &config.ttl_overrides {
            policy = policy.with_ttl(endpoint, Duration::from_secs(*secs));
        }
        policy
    }

    pub fn with_ttl(mut self, endpoint: &str, ttl: Duration) -> Self {
        self.overrides.insert(endpoint.to_string(), ttl);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn ttl_for(&self, endpoint: &str) -> Duration {
        self.overrides
            .get(endpoint)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Age of `entry` at `now`; negative when stamped in the future
    pub fn age(&self, entry: &CacheEntry, now: i64) -> i64 {
        now.saturating_sub(entry.created_at)
    }

    /// Whether `entry` is stale at `now`
    ///
    /// An entry exactly `ttl` seconds old is still fresh. Entries stamped in
    /// the future (clock skew between writers) count as fresh, up to
    /// [`MAX_CLOCK_SKEW_SECS`] ahead; anything further out is stale.
    pub fn is_expired(&self, entry: &CacheEntry, now: i64) -> bool {
        let ttl = self.ttl_for(&entry.endpoint).as_secs() as i64;
        let age = self.age(entry, now);
        age > ttl || age < -MAX_CLOCK_SKEW_SECS
    }

    /// Seconds of validity left for `entry` at `now`
    pub fn remaining(&self, entry: &CacheEntry, now: i64) -> Duration {
        let ttl = self.ttl_for(&entry.endpoint).as_secs() as i64;
        let age = self.age(entry, now).max(0);
        Duration::from_secs(ttl.saturating_sub(age).max(0) as u64)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::reference()
    }
}
