//! Host OS, kernel and network identity

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use super::CommandRunner;

static PRETTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^PRETTY_NAME="([^"]+)""#).expect("valid os-release pattern"));
static KERNEL_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+").expect("valid kernel version pattern"));

const UNKNOWN_OS: &str = "Unknown Linux Distribution";
const UNKNOWN: &str = "Unknown";

/// Payload of `/system/info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub kernel: String,
    /// `"<hostname> (<primary ip>)"`
    pub network: String,
}

/// Reads host identity from os-release and a few commands
#[derive(Clone)]
pub struct SystemProbe {
    runner: Arc<dyn CommandRunner>,
    os_release_path: PathBuf,
}

impl SystemProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, os_release_path: PathBuf) -> Self {
        Self {
            runner,
            os_release_path,
        }
    }

    pub async fn info(&self) -> SystemInfo {
        let (kernel, network) = tokio::join!(self.kernel(), self.network());
        SystemInfo {
            os: self.os().await,
            kernel,
            network,
        }
    }

    async fn os(&self) -> String {
        tokio::fs::read_to_string(&self.os_release_path)
            .await
            .ok()
            .and_then(|contents| parse_pretty_name(&contents))
            .unwrap_or_else(|| UNKNOWN_OS.to_string())
    }

    async fn kernel(&self) -> String {
        self.runner
            .output("uname", &["-r"])
            .await
            .filter(|version| KERNEL_VERSION.is_match(version))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    async fn network(&self) -> String {
        let hostname = self
            .runner
            .output("hostname", &[])
            .await
            .unwrap_or_else(|| UNKNOWN.to_string());

        let ip = self
            .runner
            .output("ip", &["route", "get", "8.8.8.8"])
            .await
            .and_then(|route| parse_route_source(&route))
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        format!("{} ({})", hostname, ip)
    }
}

fn parse_pretty_name(os_release: &str) -> Option<String> {
    PRETTY_NAME
        .captures(os_release)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Source address from `ip route get` output
/// (`8.8.8.8 via 10.0.0.1 dev eth0 src 10.0.0.5 uid 0`)
pub fn parse_route_source(route: &str) -> Option<IpAddr> {
    let mut tokens = route.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "src" {
            return tokens.next()?.parse().ok();
        }
    }
    None
}
