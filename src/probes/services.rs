//! systemd service state and version detection

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use super::CommandRunner;
use crate::validation::validate_service;

static NGINX_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"nginx/(\d+\.\d+\.\d+)").expect("valid nginx version pattern"));
static PHP_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PHP (\d+\.\d+\.\d+)").expect("valid php version pattern"));
static MARIADB_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"mariadb.*?(\d+\.\d+\.\d+)").expect("valid mariadb version pattern")
});
static REDIS_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v=(\d+\.\d+\.\d+)").expect("valid redis version pattern"));

/// Reported service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Online,
    Offline,
    Error,
}

/// State and version of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    pub version: String,
    pub online: bool,
}

impl ServiceStatus {
    fn error() -> Self {
        Self {
            status: ServiceState::Error,
            version: "Error".to_string(),
            online: false,
        }
    }

    fn not_found() -> Self {
        Self {
            status: ServiceState::Offline,
            version: "Not Found".to_string(),
            online: false,
        }
    }
}

/// Payload of `/services/status`
#[derive(Debug, Clone, Serialize)]
pub struct ServicesReport {
    pub nginx: ServiceStatus,
    pub php: ServiceStatus,
    pub mysql: ServiceStatus,
    pub redis: ServiceStatus,
}

/// Queries systemd and service binaries
#[derive(Clone)]
pub struct ServiceProbe {
    runner: Arc<dyn CommandRunner>,
}

impl ServiceProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn report(&self) -> ServicesReport {
        let (nginx, php, mysql, redis) = tokio::join!(
            self.status("nginx"),
            self.php_status(),
            self.status("mariadb"),
            self.status("redis-server"),
        );
        ServicesReport {
            nginx,
            php,
            mysql,
            redis,
        }
    }

    /// State and version of a named service
    pub async fn status(&self, service: &str) -> ServiceStatus {
        let Some(service) = validate_service(service) else {
            tracing::warn!(
                service = %crate::validation::sanitize_log_input(service),
                "Invalid service name"
            );
            return ServiceStatus::error();
        };

        let online = self.is_active(service).await;
        let version = self.version(service).await;

        ServiceStatus {
            status: if online {
                ServiceState::Online
            } else {
                ServiceState::Offline
            },
            version,
            online,
        }
    }

    /// Status of the first active PHP-FPM unit
    pub async fn php_status(&self) -> ServiceStatus {
        match self.find_active_php_fpm().await {
            Some(unit) => self.status(&unit).await,
            None => ServiceStatus::not_found(),
        }
    }

    async fn is_active(&self, service: &str) -> bool {
        self.runner
            .output("systemctl", &["status", service, "--no-pager"])
            .await
            .is_some_and(|out| out.to_ascii_lowercase().contains("active: active"))
    }

    async fn find_active_php_fpm(&self) -> Option<String> {
        let units = self
            .runner
            .output(
                "systemctl",
                &["list-units", "--type=service", "--all", "--no-pager", "--no-legend"],
            )
            .await?;

        for unit in php_fpm_candidates(&units) {
            if self.is_active(&unit).await {
                return Some(unit);
            }
        }
        None
    }

    async fn version(&self, service: &str) -> String {
        let (program, args, pattern): (&str, &[&str], &Regex) = match service {
            "nginx" => ("nginx", &["-v"][..], &*NGINX_VERSION),
            "mariadb" => ("mariadb", &["--version"][..], &*MARIADB_VERSION),
            "redis-server" => ("redis-server", &["--version"][..], &*REDIS_VERSION),
            _ => ("php", &["-v"][..], &*PHP_VERSION),
        };

        self.runner
            .output(program, args)
            .await
            .and_then(|out| parse_version(pattern, &out))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

fn parse_version(pattern: &Regex, output: &str) -> Option<String> {
    pattern
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// PHP-FPM unit names from `systemctl list-units` output, in listing order
pub fn php_fpm_candidates(listing: &str) -> Vec<String> {
    listing
        .lines()
        // list-units prefixes failed units with a bullet
        .filter_map(|line| line.split_whitespace().find(|token| *token != "●"))
        .map(|name| name.trim_start_matches('●'))
        .filter(|name| !name.is_empty() && name.len() <= 50)
        .map(|name| name.trim_end_matches(".service"))
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            lower.contains("php") && lower.contains("fpm")
        })
        .filter_map(validate_service)
        .filter(|name| name.starts_with("php"))
        .map(str::to_string)
        .collect()
}
