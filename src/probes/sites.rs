//! WordPress site discovery from nginx configs
//!
//! A site is an enabled nginx server block that mentions `wordpress` or
//! `wp-`. Its primary `server_name` is the domain and its `root` is searched
//! for `wp-includes/version.php`. Paths that resolve outside their expected
//! parent are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::validation::validate_path_segment;

static SERVER_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"server_name\s+([a-zA-Z0-9.-]+(?:\s+[a-zA-Z0-9.-]+)*)\s*;")
        .expect("valid server_name pattern")
});
static DOCUMENT_ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"root\s+([^\s;]+)\s*;").expect("valid root pattern"));
static SAFE_ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[a-zA-Z0-9/_.-]+$").expect("valid root path pattern"));
static WP_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$wp_version\s*=\s*['"]([0-9]+\.[0-9]+(?:\.[0-9]+)?(?:-[a-zA-Z0-9-]+)?)['"]"#)
        .expect("valid wp_version pattern")
});

/// One hosted WordPress site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteInfo {
    pub domain: String,
    pub status: String,
    pub wp_version: String,
    pub ssl_status: String,
}

/// Scans an nginx `sites-enabled` directory
#[derive(Debug, Clone)]
pub struct SiteProbe {
    sites_dir: PathBuf,
}

impl SiteProbe {
    pub fn new(sites_dir: PathBuf) -> Self {
        Self { sites_dir }
    }

    /// Discover sites on the blocking pool
    pub async fn sites(&self) -> Vec<SiteInfo> {
        let probe = self.clone();
        match tokio::task::spawn_blocking(move || probe.scan()).await {
            Ok(sites) => sites,
            Err(e) => {
                tracing::error!(error = %e, "Site scan task failed");
                Vec::new()
            }
        }
    }

    /// Discover sites, sorted by config file name
    pub fn scan(&self) -> Vec<SiteInfo> {
        let Ok(root) = self.sites_dir.canonicalize() else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(&root) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| name != "default")
            .filter(|name| {
                let ok = validate_path_segment(name).is_some();
                if !ok {
                    tracing::warn!(
                        file = %crate::validation::sanitize_log_input(name),
                        "Suspicious nginx config filename"
                    );
                }
                ok
            })
            .collect();
        names.sort();

        names
            .iter()
            .filter_map(|name| contained_path(&root, &root.join(name)))
            .filter_map(|config| fs::read_to_string(config).ok())
            .filter_map(|contents| parse_site(&contents))
            .collect()
    }
}

/// Canonical `path` if it resolves strictly inside `parent`
fn contained_path(parent: &Path, path: &Path) -> Option<PathBuf> {
    let resolved = path.canonicalize().ok()?;
    if resolved.starts_with(parent) && resolved != parent {
        Some(resolved)
    } else {
        tracing::warn!(path = %path.display(), "Path resolves outside its directory");
        None
    }
}

fn parse_site(config: &str) -> Option<SiteInfo> {
    if !config.contains("wordpress") && !config.contains("wp-") {
        return None;
    }

    let domain = SERVER_NAME
        .captures(config)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().split_whitespace().next())
        .filter(|d| is_hostname(d))?
        .to_string();

    let wp_version = DOCUMENT_ROOT
        .captures(config)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|root| SAFE_ROOT.is_match(root))
        .and_then(|root| Path::new(root).canonicalize().ok())
        .and_then(|root| wordpress_version(&root))
        .unwrap_or_else(|| "Unknown".to_string());

    Some(SiteInfo {
        domain,
        status: "online".to_string(),
        wp_version,
        ssl_status: "Enabled".to_string(),
    })
}

/// `$wp_version` from `<root>/wp-includes/version.php`
pub fn wordpress_version(document_root: &Path) -> Option<String> {
    if !document_root.is_dir() {
        return None;
    }
    let version_file = contained_path(document_root, &document_root.join("wp-includes/version.php"))?;
    let contents = fs::read_to_string(version_file).ok()?;
    WP_VERSION
        .captures(&contents)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_hostname(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 253
        && candidate.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
