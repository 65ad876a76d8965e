//! Resource alerts and recent host activity

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::CommandRunner;
use crate::config::ProbesConfig;

static MEM_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^MemTotal:\s+(\d+)").expect("valid MemTotal pattern"));
static MEM_AVAILABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^MemAvailable:\s+(\d+)").expect("valid MemAvailable pattern"));

/// Disk usage above this percentage raises an alert
pub const DISK_ALERT_PERCENT: f64 = 90.0;

/// Memory usage above this percentage raises an alert
pub const MEMORY_ALERT_PERCENT: f64 = 85.0;

/// Bytes read from the end of the auth log
const AUTH_LOG_TAIL_BYTES: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
}

/// One entry of `/alerts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub message: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
}

impl Alert {
    fn warning(message: &str) -> Self {
        Self {
            message: message.to_string(),
            time: "Now".to_string(),
            kind: AlertKind::Warning,
        }
    }

    fn all_clear() -> Self {
        Self {
            message: "All systems operational".to_string(),
            time: "Just now".to_string(),
            kind: AlertKind::Info,
        }
    }
}

/// One entry of `/activity/recent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub message: String,
    pub time: String,
    pub icon: String,
}

impl Activity {
    fn new(message: &str, time: &str, icon: &str) -> Self {
        Self {
            message: message.to_string(),
            time: time.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Disk and memory pressure, plus a coarse view of recent logins
#[derive(Clone)]
pub struct HostHealthProbe {
    runner: Arc<dyn CommandRunner>,
    disk_path: PathBuf,
    meminfo_path: PathBuf,
    auth_log_path: PathBuf,
}

impl HostHealthProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &ProbesConfig) -> Self {
        Self {
            runner,
            disk_path: config.disk_path.clone(),
            meminfo_path: config.meminfo_path.clone(),
            auth_log_path: config.auth_log_path.clone(),
        }
    }

    /// Warnings for high disk or memory use, or a single all-clear entry
    pub async fn alerts(&self) -> Vec<Alert> {
        let (disk, memory) = tokio::join!(self.disk_usage(), self.memory_usage());

        let mut alerts = Vec::new();
        if disk.is_some_and(|used| used > DISK_ALERT_PERCENT) {
            alerts.push(Alert::warning("High disk usage detected"));
        }
        if memory.is_some_and(|used| used > MEMORY_ALERT_PERCENT) {
            alerts.push(Alert::warning("High memory usage detected"));
        }
        if alerts.is_empty() {
            alerts.push(Alert::all_clear());
        }
        alerts
    }

    /// Recent activity, newest first
    pub async fn recent_activity(&self) -> Vec<Activity> {
        let path = self.auth_log_path.clone();
        let ssh_login = tokio::task::spawn_blocking(move || recent_ssh_login(&path))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Auth log scan task failed");
                false
            });

        let mut activity = Vec::new();
        if ssh_login {
            activity.push(Activity::new(
                "Recent SSH login detected",
                "5 minutes ago",
                "fa-sign-in-alt",
            ));
        }
        activity.push(Activity::new("System status updated", "Just now", "fa-sync-alt"));
        activity
    }

    /// Used percentage of the filesystem holding `disk_path`
    pub async fn disk_usage(&self) -> Option<f64> {
        let path = self.disk_path.to_str()?;
        let output = self.runner.output("df", &["-P", path]).await?;
        parse_df_usage(&output)
    }

    /// Used percentage of memory, counting available memory as free
    pub async fn memory_usage(&self) -> Option<f64> {
        let meminfo = tokio::fs::read_to_string(&self.meminfo_path).await.ok()?;
        parse_memory_usage(&meminfo)
    }
}

/// `Use%` column of `df -P` output
pub fn parse_df_usage(output: &str) -> Option<f64> {
    output
        .lines()
        .nth(1)?
        .split_whitespace()
        .nth(4)?
        .strip_suffix('%')?
        .parse()
        .ok()
}

/// Used memory percentage from `/proc/meminfo` contents
pub fn parse_memory_usage(meminfo: &str) -> Option<f64> {
    let total = meminfo_kb(&MEM_TOTAL, meminfo).filter(|t| *t > 0)?;
    let available = meminfo_kb(&MEM_AVAILABLE, meminfo)?.min(total);

    let used = (total - available) as f64 / total as f64 * 100.0;
    Some((used * 10.0).round() / 10.0)
}

fn meminfo_kb(pattern: &Regex, meminfo: &str) -> Option<u64> {
    pattern.captures(meminfo)?.get(1)?.as_str().parse().ok()
}

/// Whether the tail of the auth log records an accepted login
///
/// The log must be a regular file reached without symlinks.
fn recent_ssh_login(path: &Path) -> bool {
    match path.canonicalize() {
        Ok(real) if real == path && real.is_file() => {}
        _ => return false,
    }

    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let Ok(len) = file.metadata().map(|m| m.len()) else {
        return false;
    };
    if len == 0 || file.seek(SeekFrom::Start(len.saturating_sub(AUTH_LOG_TAIL_BYTES))).is_err() {
        return false;
    }

    let mut tail = Vec::new();
    if file.take(AUTH_LOG_TAIL_BYTES).read_to_end(&mut tail).is_err() {
        return false;
    }
    String::from_utf8_lossy(&tail).contains("Accepted")
}
