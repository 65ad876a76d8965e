//! Third-party HTTP integrations
//!
//! Uptime Robot monitors and StatusPage feeds. Both are optional from the
//! dashboard's point of view: handlers report an unavailable integration
//! rather than failing the page.

mod status_page;
mod uptime_robot;

pub use status_page::*;
pub use uptime_robot::*;

use std::time::Duration;

const USER_AGENT: &str = concat!("dashboard-api/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by an integration
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}
