//! Configuration management with serde serialization/deserialization
//!
//! Service-level settings (bind address, default session timeout, Chromium
//! executable) plus the baseline Chromium launch arguments. Values come
//! from an optional JSON config file and can be overridden per CLI flag.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the screenshot service.
///
/// # Examples
///
/// ```rust
/// use screenshot_api::ServiceConfig;
///
/// let config = ServiceConfig::default();
/// assert_eq!(config.port, 8080);
///
/// let config = ServiceConfig {
///     default_timeout_ms: 30_000,
///     ..Default::default()
/// };
/// assert_eq!(config.default_timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP endpoint binds to (default: 127.0.0.1)
    pub bind_address: String,

    /// Port for the HTTP endpoint (default: 8080)
    pub port: u16,

    /// Session timeout in milliseconds applied when a request carries none
    /// (default: 15000)
    pub default_timeout_ms: u64,

    /// Maximum accepted request body size in bytes (default: 1 MiB)
    ///
    /// Capture payloads are small; anything larger is a client mistake.
    pub max_body_bytes: usize,

    /// Path to the Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Port for the Prometheus metrics exporter; disabled when absent
    pub metrics_port: Option<u16>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            default_timeout_ms: 15_000,
            max_body_bytes: 1024 * 1024,
            chrome_path: None,
            metrics_port: None,
        }
    }
}

impl ServiceConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Reject configurations that cannot serve a single request.
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_address.is_empty() {
            return Err("bind_address must not be empty".to_string());
        }
        if self.default_timeout_ms == 0 {
            return Err("default_timeout_ms must be greater than 0".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Baseline Chromium arguments for disposable capture sessions.
///
/// Every session gets its own user data directory so concurrent requests
/// never trip over Chromium's profile singleton lock.
pub fn default_chrome_args() -> Vec<String> {
    let unique_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());

    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        format!("--user-data-dir=/tmp/screenshot-api-{unique_id}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_timeout(), Duration::from_secs(15));
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert!(config.chrome_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ServiceConfig {
            default_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            bind_address: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ServiceConfig = serde_json::from_str(r#"{"port": 9090}"#).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.default_timeout_ms, 15_000);
    }

    #[test]
    fn test_chrome_args_are_unique_per_session() {
        let first = default_chrome_args();
        let second = default_chrome_args();

        assert!(first.contains(&"--no-sandbox".to_string()));
        assert!(first.contains(&"--disable-gpu".to_string()));

        let data_dir = |args: &[String]| {
            args.iter()
                .find(|arg| arg.starts_with("--user-data-dir="))
                .cloned()
                .unwrap()
        };
        assert_ne!(data_dir(&first), data_dir(&second));
    }
}
