//! Configuration schema definitions.
//!
//! Settings are split by environment prefix: `APP_*` for application
//! behaviour and `API_*` for the HTTP surface. All types derive Serde traits
//! so they can be deserialized straight from environment variables.

use serde::{Deserialize, Deserializer, Serialize};

/// Root settings for the service.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    /// Application settings (`APP_*`).
    pub app: AppConfig,

    /// API server settings (`API_*`).
    pub api: ApiConfig,
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment label (e.g. "development", "production").
    pub env: Option<String>,

    /// Debug mode. Raises the default log level to `debug`.
    #[serde(deserialize_with = "deserialize_flag")]
    pub debug: bool,

    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: Option<String>,

    /// Log output format.
    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    #[serde(deserialize_with = "deserialize_flag")]
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: None,
            debug: false,
            log_level: None,
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl AppConfig {
    /// Log filter to use when no `RUST_LOG` override is present.
    pub fn effective_log_level(&self) -> &str {
        match &self.log_level {
            Some(level) => level,
            None if self.debug => "debug",
            None => "info",
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// API server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Base URL of a running service, used by the client CLI.
    pub url: Option<String>,

    /// Bearer token sent by the client CLI.
    #[serde(skip_serializing)]
    pub key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8001,
            url: None,
            key: None,
        }
    }
}

impl ApiConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for clients: the configured URL, or one derived from host and port.
    pub fn base_url(&self) -> String {
        match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_address()),
        }
    }
}

/// Accepts the usual textual spellings of a boolean flag.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "t" | "y" => Ok(true),
        "0" | "false" | "no" | "off" | "f" | "n" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value `{}`",
            other
        ))),
    }
}
