//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GateConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"127.0.0.1:0\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:0");
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts]\nrequest_secs = 0\n[rate_limit]\nsweep_interval_secs = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: timeouts.request_secs: must be greater than 0, rate_limit.sweep_interval_secs: must be greater than 0"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/mailshare.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
