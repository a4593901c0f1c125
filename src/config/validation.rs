//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check status page keys and production secrets
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::ops::RangeInclusive;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Parse a status page key: `"404"` or `"500..599"`.
pub fn parse_status_range(key: &str) -> Option<RangeInclusive<u16>> {
    let valid = |s: u16| (100..=599).contains(&s);
    match key.split_once("..") {
        Some((start, end)) => {
            let start: u16 = start.trim().parse().ok()?;
            let end: u16 = end.trim().parse().ok()?;
            (valid(start) && valid(end) && start <= end).then_some(start..=end)
        }
        None => {
            let status: u16 = key.trim().parse().ok()?;
            valid(status).then_some(status..=status)
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.http.max_body_size == 0 {
        errors.push(ValidationError::new("http.max_body_size", "must be greater than 0"));
    }

    if config.http.environment.is_production() && config.http.app_key.len() < 16 {
        errors.push(ValidationError::new(
            "http.app_key",
            "must be at least 16 characters in production",
        ));
    }

    for status in &config.exception.ignore_statuses {
        if !(100..=599).contains(status) {
            errors.push(ValidationError::new(
                "exception.ignore_statuses",
                format!("{} is not an HTTP status", status),
            ));
        }
    }

    for key in config.exception.status_pages.keys() {
        if parse_status_range(key).is_none() {
            errors.push(ValidationError::new(
                "exception.status_pages",
                format!("`{}` is neither a status nor a `start..end` range", key),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
