//! Configuration management for the dashboard API
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Security settings
    #[serde(default)]
    pub security: SecurityConfig,
    /// Local probe settings
    #[serde(default)]
    pub probes: ProbesConfig,
    /// Uptime Robot integration
    #[serde(default)]
    pub uptime_robot: UptimeRobotConfig,
    /// Third-party status feeds
    #[serde(default)]
    pub external_services: ExternalServicesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30000
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cache entries and the sweep lock
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// TTL for endpoints without an explicit entry
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Minimum spacing between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Maximum files removed per sweep
    #[serde(default = "default_sweep_max_deletions")]
    pub sweep_max_deletions: usize,
    /// Per-endpoint TTLs merged over the built-in table
    #[serde(default)]
    pub ttl_overrides: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            default_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_max_deletions: default_sweep_max_deletions(),
            ttl_overrides: HashMap::new(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/var/cache/enginescript/api")
}

fn default_ttl_secs() -> u64 {
    crate::cache::ttl::DEFAULT_TTL_SECS
}

fn default_sweep_interval() -> u64 {
    crate::cache::sweeper::DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_sweep_max_deletions() -> usize {
    crate::cache::sweeper::DEFAULT_MAX_DELETIONS
}

/// Security configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// HMAC key for CSRF tokens; a random key is generated when empty
    #[serde(default)]
    pub csrf_secret: String,
    /// CSRF token lifetime
    #[serde(default = "default_csrf_token_ttl")]
    pub csrf_token_ttl_secs: i64,
    /// Requests allowed per client per window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    /// Rate limit window length
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
    /// Use X-Forwarded-For / Forwarded / X-Real-IP for the client address
    #[serde(default)]
    pub trust_forwarded_headers: bool,
    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            csrf_secret: String::new(),
            csrf_token_ttl_secs: default_csrf_token_ttl(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
            trust_forwarded_headers: false,
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_csrf_token_ttl() -> i64 {
    7200
}

fn default_rate_limit_requests() -> u32 {
    100
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "https://localhost".to_string(),
        "http://127.0.0.1".to_string(),
        "https://127.0.0.1".to_string(),
    ]
}

/// Local system probe configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProbesConfig {
    /// Timeout for each external command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
    /// Directory of enabled nginx site configs
    #[serde(default = "default_nginx_sites_dir")]
    pub nginx_sites_dir: PathBuf,
    /// os-release file used for the OS name
    #[serde(default = "default_os_release_path")]
    pub os_release_path: PathBuf,
    /// Nginx FastCGI cache directory
    #[serde(default = "default_fastcgi_cache_dir")]
    pub fastcgi_cache_dir: PathBuf,
    /// File manager install location
    #[serde(default = "default_filemanager_path")]
    pub filemanager_path: PathBuf,
    /// File manager config file
    #[serde(default = "default_filemanager_config")]
    pub filemanager_config_path: PathBuf,
    /// Shell variables file declaring TINYFILEMANAGER_VER
    #[serde(default = "default_variables_path")]
    pub variables_path: PathBuf,
    /// Public URL of the file manager
    #[serde(default = "default_filemanager_url")]
    pub filemanager_url: String,
    /// Directories the file manager must be able to write
    #[serde(default = "default_filemanager_writable_dirs")]
    pub filemanager_writable_dirs: Vec<PathBuf>,
    /// Version reported when the variables file has none
    #[serde(default = "default_filemanager_version")]
    pub filemanager_default_version: String,
    /// Path whose filesystem is checked for disk pressure
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,
    /// Memory statistics source
    #[serde(default = "default_meminfo_path")]
    pub meminfo_path: PathBuf,
    /// Log scanned for recent SSH logins
    #[serde(default = "default_auth_log_path")]
    pub auth_log_path: PathBuf,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout(),
            nginx_sites_dir: default_nginx_sites_dir(),
            os_release_path: default_os_release_path(),
            fastcgi_cache_dir: default_fastcgi_cache_dir(),
            filemanager_path: default_filemanager_path(),
            filemanager_config_path: default_filemanager_config(),
            variables_path: default_variables_path(),
            filemanager_url: default_filemanager_url(),
            filemanager_writable_dirs: default_filemanager_writable_dirs(),
            filemanager_default_version: default_filemanager_version(),
            disk_path: default_disk_path(),
            meminfo_path: default_meminfo_path(),
            auth_log_path: default_auth_log_path(),
        }
    }
}

fn default_command_timeout() -> u64 {
    5000
}

fn default_nginx_sites_dir() -> PathBuf {
    PathBuf::from("/etc/nginx/sites-enabled")
}

fn default_os_release_path() -> PathBuf {
    PathBuf::from("/etc/os-release")
}

fn default_fastcgi_cache_dir() -> PathBuf {
    PathBuf::from("/var/cache/enginescript/fcgi")
}

fn default_filemanager_path() -> PathBuf {
    PathBuf::from("/var/www/admin/enginescript/tinyfilemanager/tinyfilemanager.php")
}

fn default_filemanager_config() -> PathBuf {
    PathBuf::from("/var/www/admin/enginescript/tinyfilemanager/config.php")
}

fn default_variables_path() -> PathBuf {
    PathBuf::from("/usr/local/bin/enginescript/enginescript-variables.txt")
}

fn default_filemanager_url() -> String {
    "/tinyfilemanager/tinyfilemanager.php".to_string()
}

fn default_filemanager_writable_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/var/www"), PathBuf::from("/tmp")]
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_meminfo_path() -> PathBuf {
    PathBuf::from("/proc/meminfo")
}

fn default_auth_log_path() -> PathBuf {
    PathBuf::from("/var/log/auth.log")
}

fn default_filemanager_version() -> String {
    "2.6".to_string()
}

/// Uptime Robot API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UptimeRobotConfig {
    /// Read-only API key; monitoring endpoints report "not configured" without it
    #[serde(default)]
    pub api_key: Option<String>,
    /// INI-style file with an `api_key` line, read when `api_key` is unset
    #[serde(default = "default_uptime_robot_config_file")]
    pub config_file: PathBuf,
    /// API base URL
    #[serde(default = "default_uptime_robot_url")]
    pub base_url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_ms: u64,
}

impl Default for UptimeRobotConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            config_file: default_uptime_robot_config_file(),
            base_url: default_uptime_robot_url(),
            timeout_ms: default_upstream_timeout(),
        }
    }
}

impl UptimeRobotConfig {
    /// API key from configuration, else from the key file; blank keys count as unset
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }

        let contents = std::fs::read_to_string(&self.config_file).ok()?;
        contents.lines().find_map(|line| {
            let (name, value) = line.split_once('=')?;
            if name.trim() != "api_key" {
                return None;
            }
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| value.to_string())
        })
    }
}

fn default_uptime_robot_config_file() -> PathBuf {
    PathBuf::from("/etc/enginescript/uptimerobot.conf")
}

fn default_uptime_robot_url() -> String {
    "https://api.uptimerobot.com/v2".to_string()
}

fn default_upstream_timeout() -> u64 {
    10000
}

/// External status feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalServicesConfig {
    /// Services shown on the dashboard
    #[serde(default = "default_external_services")]
    pub services: Vec<String>,
    /// Feed name → StatusPage `status.json` URL
    #[serde(default = "default_feeds")]
    pub feeds: BTreeMap<String, String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_ms: u64,
}

impl Default for ExternalServicesConfig {
    fn default() -> Self {
        Self {
            services: default_external_services(),
            feeds: default_feeds(),
            timeout_ms: default_upstream_timeout(),
        }
    }
}

fn default_external_services() -> Vec<String> {
    [
        "aws", "cloudflare", "digitalocean", "discord", "dropbox", "github", "gitlab",
        "googlecloud", "letsencrypt", "linode", "mailgun", "openai", "anthropic", "paypal",
        "postmark", "reddit", "sendgrid", "shopify", "slack", "stripe", "twilio", "vultr",
        "zoom",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_feeds() -> BTreeMap<String, String> {
    [
        ("anthropic", "https://status.anthropic.com/api/v2/status.json"),
        ("cloudflare", "https://www.cloudflarestatus.com/api/v2/status.json"),
        ("digitalocean", "https://status.digitalocean.com/api/v2/status.json"),
        ("discord", "https://discordstatus.com/api/v2/status.json"),
        ("dropbox", "https://status.dropbox.com/api/v2/status.json"),
        ("github", "https://www.githubstatus.com/api/v2/status.json"),
        ("linode", "https://status.linode.com/api/v2/status.json"),
        ("reddit", "https://www.redditstatus.com/api/v2/status.json"),
        ("twilio", "https://status.twilio.com/api/v2/status.json"),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect()
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DASHBOARD_*)
    /// 2. config/config.yaml (if exists)
    /// 3. config.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.request_timeout_ms", default_request_timeout())?
            .set_default("cache.dir", default_cache_dir().display().to_string())?
            .set_default("cache.default_ttl_secs", default_ttl_secs())?
            .set_default("cache.sweep_interval_secs", default_sweep_interval())?
            .set_default("cache.sweep_max_deletions", default_sweep_max_deletions() as u64)?
            .set_default("security.rate_limit_requests", default_rate_limit_requests())?
            .set_default("security.rate_limit_window_secs", default_rate_limit_window())?
            // Load from config files (lower priority)
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/config").required(false))
            // Override with environment variables (highest priority - loaded last)
            // DASHBOARD_SERVER__PORT=8081 -> server.port = 8081
            // DASHBOARD_SECURITY__ALLOWED_ORIGINS=https://a,https://b -> list
            .add_source(
                Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("security.allowed_origins")
                    .with_list_parse_key("external_services.services"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cache.dir.is_absolute() {
            return Err(ConfigError::Message(
                "Cache directory must be an absolute path".to_string(),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "Default cache TTL must be greater than zero".to_string(),
            ));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Sweep interval must be greater than zero".to_string(),
            ));
        }

        if self.cache.sweep_max_deletions == 0 {
            return Err(ConfigError::Message(
                "Sweep deletion cap must be greater than zero".to_string(),
            ));
        }

        if self.security.rate_limit_requests == 0 || self.security.rate_limit_window_secs == 0 {
            return Err(ConfigError::Message(
                "Rate limit requests and window must be greater than zero".to_string(),
            ));
        }

        if self.security.csrf_token_ttl_secs <= 0 {
            return Err(ConfigError::Message(
                "CSRF token lifetime must be positive".to_string(),
            ));
        }

        if let Some((name, _)) = self
            .external_services
            .feeds
            .iter()
            .find(|(_, url)| !url.starts_with("https://"))
        {
            return Err(ConfigError::Message(format!(
                "Status feed '{}' must use an https:// URL",
                name
            )));
        }

        Ok(())
    }
}
