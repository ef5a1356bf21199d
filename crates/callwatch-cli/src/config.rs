//! Client configuration.
//!
//! Configuration can be loaded from:
//! - TOML configuration file
//! - Environment variables (CALLWATCH_*), applied on top of the file

use anyhow::{Context, Result};
use callwatch_core::{ClientConfig, ReconnectPolicy};
use callwatch_protocol::codec::MAX_FRAME_SIZE;
use callwatch_transport::WebSocketConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST API configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Realtime channel configuration.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Credentials.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API, including the `/api` prefix.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_ms: u64,
}

/// Realtime channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// `ws://` or `wss://` origin of the channel server.
    #[serde(default = "default_ws_url")]
    pub base_url: String,

    /// Reconnect attempts after an unexpected close.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff step in milliseconds; attempt N waits N steps.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Ping interval in milliseconds. 0 disables the heartbeat.
    #[serde(default)]
    pub heartbeat_interval_ms: u64,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// File holding the access token. `~` is expanded.
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default)]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_ws_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_max_attempts() -> u32 {
    callwatch_core::reconnect::DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay() -> u64 {
    2_000
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_max_message_size() -> usize {
    MAX_FRAME_SIZE
}

fn default_token_file() -> String {
    "~/.config/callwatch/token".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_ws_url(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            heartbeat_interval_ms: 0,
            connect_timeout_ms: default_connect_timeout(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from the default paths, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "callwatch.toml",
            "/etc/callwatch/callwatch.toml",
            "~/.config/callwatch/callwatch.toml",
        ];

        let mut config = Self::default();
        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                config = Self::from_file(expanded.as_ref())?;
                break;
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Override the endpoints and token file from `CALLWATCH_*` variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CALLWATCH_API_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("CALLWATCH_WS_URL") {
            self.realtime.base_url = url;
        }
        if let Some(path) = lookup("CALLWATCH_TOKEN_FILE") {
            self.auth.token_file = path;
        }
    }

    /// Settings for the realtime client.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.realtime.base_url.clone(),
            reconnect: ReconnectPolicy::new(
                self.realtime.max_attempts,
                Duration::from_millis(self.realtime.base_delay_ms),
            ),
            max_frame_size: self.realtime.max_message_size,
        }
    }

    /// Settings for the WebSocket transport.
    #[must_use]
    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig {
            connect_timeout: Duration::from_millis(self.realtime.connect_timeout_ms),
            max_message_size: self.realtime.max_message_size,
        }
    }

    /// Heartbeat interval, if enabled.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self.realtime.heartbeat_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// REST request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.realtime.base_url, "ws://localhost:8000");
        assert!(!config.metrics.enabled);
        assert_eq!(config.heartbeat_interval(), None);

        let client = config.client_config();
        assert_eq!(client.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [realtime]
            base_url = "wss://calls.example.com"
            max_attempts = 3
            base_delay_ms = 500
            heartbeat_interval_ms = 25000

            [metrics]
            enabled = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.realtime.base_url, "wss://calls.example.com");
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(
            config.client_config().reconnect,
            ReconnectPolicy::new(3, Duration::from_millis(500))
        );
        assert_eq!(config.heartbeat_interval(), Some(Duration::from_secs(25)));
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9090);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "CALLWATCH_WS_URL" => Some("wss://prod.example.com".to_string()),
            "CALLWATCH_TOKEN_FILE" => Some("/run/secrets/callwatch".to_string()),
            _ => None,
        });

        assert_eq!(config.realtime.base_url, "wss://prod.example.com");
        assert_eq!(config.auth.token_file, "/run/secrets/callwatch");
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let path = std::env::temp_dir().join(format!("callwatch-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[realtime\nbase_url = 1").unwrap();
        assert!(Config::from_file(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
