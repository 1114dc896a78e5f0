//! Configuration for copilot-pulse, read from `.copilot-pulse/dashboard.toml`.
//!
//! Settings are layered file → environment → CLI flags. A `.env` file in the
//! working directory is loaded into the environment first.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! cors_origins = ["http://localhost:5173"]
//!
//! [database]
//! path = ".copilot-pulse/metrics.db"
//! seed_sample_data = false
//!
//! [github]
//! api_url = "https://api.github.com"
//! org = "acme"
//!
//! [refresh]
//! api_url = "http://127.0.0.1:8000"
//! interval_secs = 30
//! request_timeout_secs = 30
//! ```
//!
//! The GitHub token is only ever read from `GITHUB_TOKEN`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dashboard::api::GitHubSettings;
use crate::dashboard::github::DEFAULT_GITHUB_API_URL;
use crate::dashboard::server::ServerConfig;

pub const CONFIG_DIR: &str = ".copilot-pulse";
pub const CONFIG_FILE: &str = "dashboard.toml";

pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_ORG: &str = "GITHUB_ORG";
pub const ENV_API_URL: &str = "COPILOT_PULSE_API_URL";

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed outside dev mode.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Load sample data into an empty database on startup.
    #[serde(default)]
    pub seed_sample_data: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("metrics.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            seed_sample_data: false,
        }
    }
}

/// `[github]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubSection {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            org: None,
        }
    }
}

/// `[refresh]`: settings for `watch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Zero disables the timer; only manual refreshes run.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_interval_secs() -> u64 {
    crate::refresh::DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_request_timeout_secs() -> u64 {
    crate::refresh::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Parsed `dashboard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub refresh: RefreshSection,
}

impl DashboardToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse dashboard.toml")
    }

    /// Load `dashboard.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// An explicit `--config` path must exist; otherwise fall back to the
    /// default location.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_or_default(Path::new(CONFIG_DIR)),
        }
    }

    /// Save configuration to a TOML file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(self).context("Failed to serialize dashboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// GitHub token from the environment. Empty values count as unset.
    pub fn github_token(&self) -> Option<String> {
        non_empty_env(ENV_GITHUB_TOKEN)
    }

    /// GitHub organization (env overrides file).
    pub fn github_org(&self) -> Option<String> {
        non_empty_env(ENV_GITHUB_ORG).or_else(|| self.github.org.clone())
    }

    /// Base URL `watch` and `sync` talk to (env overrides file).
    pub fn api_url(&self) -> String {
        non_empty_env(ENV_API_URL).unwrap_or_else(|| self.refresh.api_url.clone())
    }

    /// `None` when the timer is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh.interval_secs > 0).then(|| Duration::from_secs(self.refresh.interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.request_timeout_secs)
    }

    pub fn github_settings(&self) -> GitHubSettings {
        GitHubSettings {
            api_url: self.github.api_url.clone(),
            token: self.github_token(),
            org: self.github_org(),
        }
    }

    /// Server settings from file and environment, before CLI overrides.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            db_path: self.database.path.clone(),
            cors_origins: self.server.cors_origins.clone(),
            dev_mode: false,
            seed: self.database.seed_sample_data,
            github: self.github_settings(),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0: the OS will pick a random port".to_string());
        }
        if self.server.cors_origins.is_empty() {
            warnings.push(
                "server.cors_origins is empty: browsers are rejected unless --dev is set"
                    .to_string(),
            );
        }
        for (key, url) in [
            ("github.api_url", &self.github.api_url),
            ("refresh.api_url", &self.refresh.api_url),
        ] {
            if !is_http_url(url) {
                warnings.push(format!("{} '{}' is not an http(s) URL", key, url));
            }
        }

        let interval = self.refresh.interval_secs;
        let timeout = self.refresh.request_timeout_secs;
        if interval == 0 {
            warnings.push(
                "refresh.interval_secs is 0: automatic refresh is disabled".to_string(),
            );
        }
        if timeout == 0 {
            warnings.push(
                "refresh.request_timeout_secs is 0: every request will time out".to_string(),
            );
        }
        if interval > 0 && timeout > interval.saturating_mul(10) {
            warnings.push(format!(
                "refresh.request_timeout_secs ({}) is more than 10x interval_secs ({}): cycles will pile up behind slow requests",
                timeout, interval
            ));
        }

        warnings
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load `.env` from the working directory into the process environment.
pub fn load_env_file() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env file: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = DashboardToml::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, PathBuf::from(".copilot-pulse/metrics.db"));
        assert!(!config.database.seed_sample_data);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.refresh.request_timeout_secs, 30);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let content = r#"
[server]
host = "0.0.0.0"
port = 9000
cors_origins = ["https://metrics.example.com"]

[database]
path = "/var/lib/pulse.db"
seed_sample_data = true

[github]
api_url = "https://github.example.com/api/v3"
org = "acme"

[refresh]
api_url = "http://pulse:9000"
interval_secs = 60
request_timeout_secs = 10
"#;
        let config = DashboardToml::parse(content).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["https://metrics.example.com"]);
        assert!(config.database.seed_sample_data);
        assert_eq!(config.github.org.as_deref(), Some("acme"));
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));

        let server = config.server_config();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.db_path, PathBuf::from("/var/lib/pulse.db"));
        assert!(server.seed);
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = DashboardToml::parse("[refresh]\ninterval_secs = 5\n").unwrap();
        assert_eq!(config.refresh.interval_secs, 5);
        assert_eq!(config.refresh.request_timeout_secs, 30);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(DashboardToml::parse("[server]\nport = \"eighty\"\n").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = DashboardToml::default();
        config.github.org = Some("acme".into());
        config.refresh.interval_secs = 15;
        config.save(&path).unwrap();

        let loaded = DashboardToml::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let config = DashboardToml::load_or_default(dir.path()).unwrap();
        assert_eq!(config, DashboardToml::default());
    }

    #[test]
    fn test_resolve_explicit_missing_file_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(DashboardToml::resolve(Some(&missing)).is_err());
    }

    #[test]
    fn test_zero_interval_disables_timer() {
        let mut config = DashboardToml::default();
        config.refresh.interval_secs = 0;
        assert_eq!(config.refresh_interval(), None);
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("automatic refresh is disabled")));
    }

    #[test]
    fn test_validate_timeout_far_above_interval() {
        let mut config = DashboardToml::default();
        config.refresh.interval_secs = 2;
        config.refresh.request_timeout_secs = 60;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("more than 10x"));
    }

    #[test]
    fn test_validate_urls_and_cors() {
        let mut config = DashboardToml::default();
        config.server.cors_origins.clear();
        config.refresh.api_url = "localhost:8000".into();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("cors_origins is empty")));
        assert!(warnings.iter().any(|w| w.contains("refresh.api_url")));
    }

    #[test]
    fn test_env_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved_org = std::env::var(ENV_GITHUB_ORG).ok();
        let saved_url = std::env::var(ENV_API_URL).ok();
        let saved_token = std::env::var(ENV_GITHUB_TOKEN).ok();

        let mut config = DashboardToml::default();
        config.github.org = Some("from-file".into());

        unsafe {
            std::env::remove_var(ENV_GITHUB_ORG);
            std::env::remove_var(ENV_API_URL);
            std::env::set_var(ENV_GITHUB_TOKEN, "");
        }
        assert_eq!(config.github_org().as_deref(), Some("from-file"));
        assert_eq!(config.api_url(), "http://127.0.0.1:8000");
        assert_eq!(config.github_token(), None);

        unsafe {
            std::env::set_var(ENV_GITHUB_ORG, "from-env");
            std::env::set_var(ENV_API_URL, "http://pulse.internal");
            std::env::set_var(ENV_GITHUB_TOKEN, "ghp_env");
        }
        assert_eq!(config.github_org().as_deref(), Some("from-env"));
        assert_eq!(config.api_url(), "http://pulse.internal");
        let github = config.github_settings();
        assert_eq!(github.token.as_deref(), Some("ghp_env"));
        assert_eq!(github.org.as_deref(), Some("from-env"));

        unsafe {
            match saved_org {
                Some(v) => std::env::set_var(ENV_GITHUB_ORG, v),
                None => std::env::remove_var(ENV_GITHUB_ORG),
            }
            match saved_url {
                Some(v) => std::env::set_var(ENV_API_URL, v),
                None => std::env::remove_var(ENV_API_URL),
            }
            match saved_token {
                Some(v) => std::env::set_var(ENV_GITHUB_TOKEN, v),
                None => std::env::remove_var(ENV_GITHUB_TOKEN),
            }
        }
    }
}
