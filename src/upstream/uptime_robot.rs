//! Uptime Robot v2 API client

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::UptimeRobotConfig;
use crate::error::{AppError, AppResult};

/// Monitor as returned by `getMonitors`
#[derive(Debug, Clone, Deserialize)]
pub struct RawMonitor {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: u8,
    /// `"<day>-<week>-<month>"` percentages
    #[serde(default)]
    pub custom_uptime_ratio: Option<String>,
    #[serde(default)]
    pub last_check_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MonitorsResponse {
    stat: String,
    #[serde(default)]
    monitors: Vec<RawMonitor>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Aggregate health across all monitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Partial,
    Critical,
    Unknown,
}

/// Payload of `/monitoring/uptime`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UptimeSummary {
    pub enabled: bool,
    pub overall_status: OverallStatus,
    pub total_monitors: usize,
    pub up: usize,
    pub down: usize,
    pub paused: usize,
}

impl UptimeSummary {
    pub fn from_monitors(monitors: &[RawMonitor]) -> Self {
        let total = monitors.len();
        let up = monitors.iter().filter(|m| m.status == 2).count();
        let down = monitors.iter().filter(|m| matches!(m.status, 8 | 9)).count();
        let paused = monitors.iter().filter(|m| matches!(m.status, 0 | 1)).count();

        let overall_status = if total == 0 {
            OverallStatus::Unknown
        } else if down > 0 {
            OverallStatus::Critical
        } else if up == total {
            OverallStatus::Healthy
        } else if up > 0 {
            OverallStatus::Partial
        } else {
            OverallStatus::Unknown
        };

        Self {
            enabled: true,
            overall_status,
            total_monitors: total,
            up,
            down,
            paused,
        }
    }
}

/// One monitor in `/monitoring/uptime/monitors`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorView {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub status: u8,
    pub status_text: &'static str,
    pub uptime_day: Option<f64>,
    pub uptime_week: Option<f64>,
    pub uptime_month: Option<f64>,
    pub last_check: Option<i64>,
}

impl From<&RawMonitor> for MonitorView {
    fn from(raw: &RawMonitor) -> Self {
        let ratio = raw.custom_uptime_ratio.as_deref();
        Self {
            id: raw.id,
            name: raw
                .friendly_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            url: raw.url.clone().unwrap_or_default(),
            status: raw.status,
            status_text: status_text(raw.status),
            uptime_day: ratio.and_then(|r| uptime_ratio(r, 0)),
            uptime_week: ratio.and_then(|r| uptime_ratio(r, 1)),
            uptime_month: ratio.and_then(|r| uptime_ratio(r, 2)),
            last_check: raw.last_check_time,
        }
    }
}

/// Payload of `/monitoring/uptime/monitors`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorList {
    pub enabled: bool,
    pub total: usize,
    pub monitors: Vec<MonitorView>,
}

impl MonitorList {
    pub fn from_monitors(monitors: &[RawMonitor]) -> Self {
        let monitors: Vec<MonitorView> = monitors.iter().map(MonitorView::from).collect();
        Self {
            enabled: true,
            total: monitors.len(),
            monitors,
        }
    }
}

pub fn status_text(status: u8) -> &'static str {
    match status {
        0 => "Paused",
        1 => "Not checked yet",
        2 => "Up",
        8 => "Seems down",
        9 => "Down",
        _ => "Unknown",
    }
}

fn uptime_ratio(ratios: &str, index: usize) -> Option<f64> {
    ratios.split('-').nth(index)?.trim().parse().ok()
}

/// Read-only Uptime Robot client
#[derive(Debug, Clone)]
pub struct UptimeRobotClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UptimeRobotClient {
    /// `None` when no API key is configured
    pub fn from_config(config: &UptimeRobotConfig) -> reqwest::Result<Option<Self>> {
        let Some(api_key) = config.resolve_api_key() else {
            return Ok(None);
        };
        let client = super::http_client(Duration::from_millis(config.timeout_ms))?;
        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        }))
    }

    pub async fn monitors(&self) -> AppResult<Vec<RawMonitor>> {
        let response = self
            .client
            .post(format!("{}/getMonitors", self.base_url))
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("custom_uptime_ratios", "1-7-30"),
                ("response_times", "0"),
                ("logs", "0"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Uptime Robot request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Uptime Robot returned HTTP {}",
                response.status()
            )));
        }

        let body: MonitorsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Uptime Robot response: {}", e)))?;

        if body.stat != "ok" {
            return Err(AppError::Upstream(format!(
                "Uptime Robot error: {}",
                body.error.map(|e| e.to_string()).unwrap_or_default()
            )));
        }

        tracing::debug!(count = body.monitors.len(), "Fetched Uptime Robot monitors");
        Ok(body.monitors)
    }
}
