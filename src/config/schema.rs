//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! dispatcher. All types derive Serde traits for deserialization from
//! config files; every field has a default so a minimal file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Application-level HTTP settings.
    pub http: HttpConfig,

    /// Exception reporting and rendering.
    pub exception: ExceptionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.http.environment.is_production()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3333").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3333".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Application-level HTTP settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub environment: Environment,

    /// Secret used to sign URLs. Required in production.
    pub app_key: String,

    /// Maximum buffered request body, in bytes.
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            app_key: String::new(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// Exception reporting and rendering.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExceptionConfig {
    /// Statuses never reported.
    pub ignore_statuses: Vec<u16>,

    /// Error codes never reported.
    pub ignore_codes: Vec<String>,

    /// Status (`"404"`) or range (`"500..599"`) to template name, used for
    /// HTML responses in production.
    pub status_pages: BTreeMap<String, String>,
}

impl Default for ExceptionConfig {
    fn default() -> Self {
        Self {
            ignore_statuses: vec![400, 401, 422],
            ignore_codes: vec![crate::error::E_ROUTE_NOT_FOUND.to_string()],
            status_pages: BTreeMap::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3333");
        assert_eq!(config.exception.ignore_statuses, vec![400, 401, 422]);
        assert_eq!(config.http.environment, Environment::Development);
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [http]
            environment = "production"
            app_key = "secret"

            [exception.status_pages]
            "404" = "errors/not_found"
            "500..599" = "errors/server_error"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert!(config.http.environment.is_production());
        assert_eq!(config.http.max_body_size, 1024 * 1024);
        assert_eq!(config.exception.status_pages.len(), 2);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
