//! StatusPage (`/api/v2/status.json`) feeds

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::ExternalServicesConfig;
use crate::error::{AppError, AppResult};

/// Normalized feed status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    pub indicator: String,
    pub description: String,
}

impl FeedStatus {
    /// Collapse StatusPage indicators into `none`, `minor` or `major`
    pub fn from_indicator(indicator: &str) -> Self {
        let (indicator, description) = match indicator {
            "none" | "operational" => ("none", "All Systems Operational"),
            "major" | "critical" => ("major", "Major Outage"),
            _ => ("minor", "Partially Degraded Service"),
        };
        Self {
            indicator: indicator.to_string(),
            description: description.to_string(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            indicator: "major".to_string(),
            description: "Unable to fetch status".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusDocument {
    status: StatusBlock,
}

#[derive(Debug, Deserialize)]
struct StatusBlock {
    indicator: String,
}

/// Fetches whitelisted StatusPage feeds
#[derive(Debug, Clone)]
pub struct StatusPageClient {
    client: reqwest::Client,
    feeds: BTreeMap<String, String>,
}

impl StatusPageClient {
    pub fn from_config(config: &ExternalServicesConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: super::http_client(Duration::from_millis(config.timeout_ms))?,
            feeds: config.feeds.clone(),
        })
    }

    pub fn knows(&self, feed: &str) -> bool {
        self.feeds.contains_key(feed)
    }

    /// Current status of a configured feed
    ///
    /// Unknown feeds are a validation error; network and decoding failures
    /// are reported as [`AppError::Upstream`].
    pub async fn status(&self, feed: &str) -> AppResult<FeedStatus> {
        let url = self
            .feeds
            .get(feed)
            .ok_or_else(|| AppError::Validation("Unknown status feed".to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Upstream(format!("Feed {} request failed: {}", feed, e)))?;

        let doc: StatusDocument = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Feed {} returned invalid JSON: {}", feed, e)))?;

        Ok(FeedStatus::from_indicator(&doc.status.indicator))
    }
}
