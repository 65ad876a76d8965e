//! File manager status and the Redis / FastCGI cache backends

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::CommandRunner;
use crate::config::ProbesConfig;
use crate::validation::log_security_event;

static TFM_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"TINYFILEMANAGER_VER="([^"]*)""#).expect("valid file manager version pattern")
});
static REDIS_USED_MEMORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"used_memory:(\d+)").expect("valid used_memory pattern"));
static REDIS_USED_MEMORY_HUMAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"used_memory_human:([^\r\n]+)").expect("valid used_memory_human pattern")
});

/// Payload of `/tools/filemanager/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileManagerStatus {
    pub available: bool,
    pub config_exists: bool,
    pub writable_dirs: BTreeMap<String, bool>,
    pub url: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct FileManagerProbe {
    install_path: PathBuf,
    config_path: PathBuf,
    variables_path: PathBuf,
    writable_dirs: Vec<PathBuf>,
    url: String,
    default_version: String,
}

impl FileManagerProbe {
    pub fn from_config(config: &ProbesConfig) -> Self {
        Self {
            install_path: config.filemanager_path.clone(),
            config_path: config.filemanager_config_path.clone(),
            variables_path: config.variables_path.clone(),
            writable_dirs: config.filemanager_writable_dirs.clone(),
            url: config.filemanager_url.clone(),
            default_version: config.filemanager_default_version.clone(),
        }
    }

    pub fn status(&self) -> FileManagerStatus {
        let writable_dirs = self
            .writable_dirs
            .iter()
            .map(|dir| (dir.display().to_string(), is_writable(dir)))
            .collect();

        FileManagerStatus {
            available: self.install_path.exists(),
            config_exists: self.config_path.exists(),
            writable_dirs,
            url: self.url.clone(),
            version: self.version(),
        }
    }

    fn version(&self) -> String {
        std::fs::read_to_string(&self.variables_path)
            .ok()
            .and_then(|vars| parse_tfm_version(&vars))
            .unwrap_or_else(|| self.default_version.clone())
    }
}

fn parse_tfm_version(variables: &str) -> Option<String> {
    TFM_VERSION
        .captures(variables)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A directory counts as writable when a scratch file can be created in it
fn is_writable(dir: &Path) -> bool {
    dir.is_dir() && tempfile::tempfile_in(dir).is_ok()
}

/// Redis memory usage from `INFO memory`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedisStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// FastCGI cache directory size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastCgiStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of clearing one cache type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearResult {
    pub success: bool,
    pub message: String,
}

impl ClearResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Inspects and flushes the server-side caches in front of the sites
#[derive(Clone)]
pub struct CacheBackendProbe {
    runner: Arc<dyn CommandRunner>,
    fastcgi_dir: PathBuf,
}

impl CacheBackendProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, fastcgi_dir: PathBuf) -> Self {
        Self {
            runner,
            fastcgi_dir,
        }
    }

    pub async fn redis_status(&self) -> RedisStatus {
        let Some(info) = self.runner.output("redis-cli", &["INFO", "memory"]).await else {
            return RedisStatus {
                available: false,
                used_memory: None,
                used_memory_human: None,
                reason: Some("Unable to connect to Redis".to_string()),
            };
        };

        RedisStatus {
            available: true,
            used_memory: REDIS_USED_MEMORY
                .captures(&info)
                .and_then(|c| c[1].parse().ok()),
            used_memory_human: REDIS_USED_MEMORY_HUMAN
                .captures(&info)
                .map(|c| c[1].trim().to_string()),
            reason: None,
        }
    }

    pub async fn fastcgi_status(&self) -> FastCgiStatus {
        if !self.fastcgi_dir.is_dir() {
            return FastCgiStatus {
                available: false,
                path: None,
                size: None,
                reason: Some("FastCGI cache directory not found".to_string()),
            };
        }

        let path = self.fastcgi_dir.display().to_string();
        let size = self
            .runner
            .output("du", &["-sh", &path])
            .await
            .and_then(|out| out.split_whitespace().next().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());

        FastCgiStatus {
            available: true,
            path: Some(path),
            size: Some(size),
            reason: None,
        }
    }

    pub async fn clear_redis(&self) -> ClearResult {
        let flushed = self
            .runner
            .output("redis-cli", &["FLUSHALL"])
            .await
            .is_some_and(|out| out == "OK");

        if flushed {
            log_security_event("Cache cleared", "Redis cache flushed successfully", None);
            ClearResult::ok("Redis cache cleared successfully")
        } else {
            ClearResult::failed("Failed to clear Redis cache")
        }
    }

    pub async fn clear_fastcgi(&self) -> ClearResult {
        if !self.fastcgi_dir.exists() {
            return ClearResult::ok("FastCGI cache directory does not exist (nothing to clear)");
        }
        if !self.fastcgi_dir.is_dir() {
            return ClearResult::failed("FastCGI cache path exists but is not a directory");
        }

        let path = self.fastcgi_dir.display().to_string();
        let deleted = self
            .runner
            .execute("find", &[&path, "-type", "f", "-delete"])
            .await
            .is_some_and(|out| out.success);

        if deleted {
            log_security_event("Cache cleared", "FastCGI cache cleared successfully", None);
            ClearResult::ok("FastCGI cache cleared successfully")
        } else {
            ClearResult::failed("Failed to clear FastCGI cache")
        }
    }
}
