//! File-backed response cache
//!
//! - `key`: endpoint + params → filesystem-safe key
//! - `store`: atomic JSON entries on disk
//! - `ttl`: per-endpoint freshness and the shared expiry predicate
//! - `sweeper`: lock-protected periodic expiry cleanup
//! - `facade`: the [`ResponseCache`] handlers talk to

pub mod clock;
pub mod facade;
pub mod key;
pub mod store;
pub mod sweeper;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use facade::{CacheHit, CacheStats, ResponseCache};
pub use key::CacheKey;
pub use store::{CacheEntry, CacheStore, Slot};
pub use sweeper::{CacheSweeper, SweepOutcome, SweepReport};
pub use ttl::TtlPolicy;
