//! Configuration for the Marzban exporter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Environment variable holding the control-plane base URL.
pub const ENV_URL: &str = "MARZBAN_URL";
/// Environment variable holding the admin username.
pub const ENV_USERNAME: &str = "MARZBAN_USERNAME";
/// Environment variable holding the admin password.
pub const ENV_PASSWORD: &str = "MARZBAN_PASSWORD";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Control-plane connection settings.
    #[serde(default)]
    pub marzban: MarzbanConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control-plane connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MarzbanConfig {
    /// Base URL of the panel, without the `/api` suffix.
    #[serde(default)]
    pub url: String,

    /// Admin username.
    #[serde(default)]
    pub username: String,

    /// Admin password.
    #[serde(default)]
    pub password: String,

    /// Per-request timeout (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for MarzbanConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl fmt::Debug for MarzbanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarzbanConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:9090").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from an optional JSON5 file and the process
    /// environment, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load configuration from an optional JSON5 file and an environment
    /// lookup, then validate it.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = path.map(std::fs::read_to_string).transpose()?;
        Self::from_sources(content.as_deref(), env)
    }

    /// Build configuration from optional file content and an environment
    /// lookup. Non-empty environment values win over the file.
    pub fn from_sources<F>(content: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match content {
            Some(content) => json5::from_str(content)?,
            None => ExporterConfig::default(),
        };
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Overlay credentials from the environment.
    pub fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_URL) {
            self.marzban.url = url;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.marzban.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.marzban.password = password;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marzban.url.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Control-plane URL is required (set {})",
                ENV_URL
            )));
        }

        if !self.marzban.url.starts_with("http://") && !self.marzban.url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "Control-plane URL must start with http:// or https://: {}",
                self.marzban.url
            )));
        }

        if self.marzban.username.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Admin username is required (set {})",
                ENV_USERNAME
            )));
        }

        if self.marzban.password.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Admin password is required (set {})",
                ENV_PASSWORD
            )));
        }

        if self.marzban.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        // Validate listen address format
        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        Ok(())
    }
}
