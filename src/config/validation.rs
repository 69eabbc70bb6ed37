//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{CounterBackend, GateConfig, PLACEHOLDER_API_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if !config.rate_limit.ip_limits().is_consistent() {
        errors.push(ValidationError::new(
            "rate_limit.ip_per_minute",
            "must be >= rate_limit.ip_per_second",
        ));
    }

    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be greater than 0"));
    }

    if config.rate_limit.backend == CounterBackend::Redis && config.rate_limit.redis_url.trim().is_empty() {
        errors.push(ValidationError::new("rate_limit.redis_url", "required when backend = \"redis\""));
    }

    if !config.share_defaults.rate_limits().is_consistent() {
        errors.push(ValidationError::new(
            "share_defaults.rate_limit_per_minute",
            "must be >= share_defaults.rate_limit_per_second",
        ));
    }

    if config.admin.enabled && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY) {
        errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
    }

    if config.dev_guard.enabled {
        if let Err(e) = url::Url::parse(&config.dev_guard.endpoint) {
            errors.push(ValidationError::new("dev_guard.endpoint", e.to_string()));
        }
        if config.dev_guard.timeout_ms == 0 {
            errors.push(ValidationError::new("dev_guard.timeout_ms", "must be greater than 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&GateConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = GateConfig::default();
        config.timeouts.request_secs = 0;
        config.rate_limit.ip_per_second = 50;
        config.rate_limit.ip_per_minute = 10;
        config.share_defaults.rate_limit_per_second = 9;
        config.share_defaults.rate_limit_per_minute = 3;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "timeouts.request_secs",
                "rate_limit.ip_per_minute",
                "share_defaults.rate_limit_per_minute",
                "admin.api_key",
            ]
        );
    }

    #[test]
    fn test_redis_backend_needs_url() {
        let mut config = GateConfig::default();
        config.rate_limit.backend = CounterBackend::Redis;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "rate_limit.redis_url");
    }

    #[test]
    fn test_dev_guard_endpoint_checked_only_when_enabled() {
        let mut config = GateConfig::default();
        config.dev_guard.endpoint = "::nope".into();
        assert!(validate_config(&config).is_ok());

        config.dev_guard.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "dev_guard.endpoint");
    }
}
