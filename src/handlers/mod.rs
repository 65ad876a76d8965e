//! HTTP handlers for the dashboard API

mod activity;
mod batch;
mod cache;
mod cached;
mod csrf;
mod external;
mod health;
mod host;
mod monitoring;

pub use activity::*;
pub use batch::*;
pub use cache::*;
pub use cached::*;
pub use csrf::*;
pub use external::*;
pub use health::*;
pub use host::*;
pub use monitoring::*;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::MetricsState;
use crate::middleware::CsrfState;
use crate::probes::{
    CacheBackendProbe, CommandRunner, FileManagerProbe, HostHealthProbe, ServiceProbe,
    SiteProbe, SystemCommandRunner, SystemProbe,
};
use crate::upstream::{StatusPageClient, UptimeRobotClient};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<ResponseCache>,
    pub metrics: Arc<MetricsState>,
    pub csrf: Arc<CsrfState>,
    pub services: ServiceProbe,
    pub system: SystemProbe,
    pub sites: SiteProbe,
    pub file_manager: FileManagerProbe,
    pub cache_backends: CacheBackendProbe,
    pub host_health: HostHealthProbe,
    /// `None` when no API key is configured
    pub uptime_robot: Option<UptimeRobotClient>,
    pub status_pages: StatusPageClient,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State backed by real host commands
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let runner = Arc::new(SystemCommandRunner::new(Duration::from_millis(
            config.probes.command_timeout_ms,
        )));
        Self::with_runner(config, runner)
    }

    /// State with a caller-provided command runner
    pub fn with_runner(config: AppConfig, runner: Arc<dyn CommandRunner>) -> AppResult<Self> {
        let cache = Arc::new(ResponseCache::new(&config.cache));
        Self::with_parts(config, runner, cache)
    }

    pub fn with_parts(
        config: AppConfig,
        runner: Arc<dyn CommandRunner>,
        cache: Arc<ResponseCache>,
    ) -> AppResult<Self> {
        let csrf_secret = if config.security.csrf_secret.is_empty() {
            tracing::warn!("No CSRF secret configured; tokens will not survive a restart");
            CsrfState::generate_secret()
        } else {
            config.security.csrf_secret.clone()
        };
        let csrf = Arc::new(CsrfState::new(csrf_secret, config.security.csrf_token_ttl_secs));

        let uptime_robot = UptimeRobotClient::from_config(&config.uptime_robot)
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        if uptime_robot.is_none() {
            tracing::info!("Uptime Robot API key not configured; monitoring endpoints disabled");
        }
        let status_pages = StatusPageClient::from_config(&config.external_services)
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            services: ServiceProbe::new(runner.clone()),
            system: SystemProbe::new(runner.clone(), config.probes.os_release_path.clone()),
            sites: SiteProbe::new(config.probes.nginx_sites_dir.clone()),
            file_manager: FileManagerProbe::from_config(&config.probes),
            host_health: HostHealthProbe::new(runner.clone(), &config.probes),
            cache_backends: CacheBackendProbe::new(runner, config.probes.fastcgi_cache_dir.clone()),
            metrics: Arc::new(MetricsState::new()),
            uptime_robot,
            status_pages,
            csrf,
            cache,
            config,
            started_at: Utc::now(),
        })
    }
}
