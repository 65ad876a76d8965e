//! Dashboard API Library
//!
//! Server status dashboard backend with a filesystem response cache.
//! This library exposes core modules for testing.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod probes;
pub mod routes;
pub mod upstream;
pub mod validation;

// Re-export commonly used types for tests
pub use cache::{CacheHit, CacheStore, CacheSweeper, ResponseCache, SweepOutcome, TtlPolicy};
pub use config::{AppConfig, CacheConfig};
pub use error::{AppError, AppResult};
pub use handlers::AppState;
pub use middleware::{ClientIpKeyExtractor, CsrfState};
pub use probes::{CommandOutput, CommandRunner};
pub use routes::{api_router, build_router};
