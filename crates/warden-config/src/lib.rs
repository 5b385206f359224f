//! Configuration parsing and validation for wardend
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Login deadline and failed-attempt escalation tuning
//! - Moderation defaults (mute duration)
//! - Storage backend selection
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let policy = parse_config("config_version = 1").unwrap();

        assert_eq!(policy.auth.login_deadline, Duration::from_secs(300));
        assert_eq!(policy.auth.escalation.threshold, 5);
        assert_eq!(policy.auth.escalation.short_ban_minutes, 5);
        assert_eq!(policy.auth.escalation.long_ban_minutes, 1440);
        assert_eq!(policy.moderation.default_mute_minutes, -1);
        assert_eq!(policy.storage.backend, StorageBackend::Json);
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [auth]
            login_deadline_secs = 120

            [auth.escalation]
            threshold = 3
            short_ban_minutes = 10
            long_ban_minutes = 720

            [moderation]
            default_mute_minutes = 30

            [storage]
            backend = "sqlite"
            data_dir = "/srv/wardend"
        "#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.auth.login_deadline, Duration::from_secs(120));
        assert_eq!(policy.auth.escalation.threshold, 3);
        assert_eq!(policy.auth.escalation.short_ban_minutes, 10);
        assert_eq!(policy.auth.escalation.long_ban_minutes, 720);
        assert_eq!(policy.moderation.default_mute_minutes, 30);
        assert_eq!(policy.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            policy.storage.data_dir,
            std::path::PathBuf::from("/srv/wardend")
        );
    }

    #[test]
    fn reject_unknown_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let config = r#"
            config_version = 1

            [auth]
            login_deadline_secs = 0

            [auth.escalation]
            threshold = 0
            short_ban_minutes = 0

            [moderation]
            default_mute_minutes = -5
        "#;

        let result = parse_config(config);
        let Err(ConfigError::ValidationFailed { errors }) = result else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_version = 1\n").unwrap();

        let policy = load_config(&path).unwrap();
        assert_eq!(policy.auth.escalation.threshold, 5);
    }
}
