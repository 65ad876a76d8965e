//! Middleware for the dashboard API
//!
//! CSRF protection for state-changing requests, per-client rate limiting
//! and the request-driven cache sweep.

mod csrf;
mod rate_limit;
mod sweep;

pub use csrf::*;
pub use rate_limit::*;
pub use sweep::*;
