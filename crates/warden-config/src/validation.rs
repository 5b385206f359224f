//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("auth.login_deadline_secs must be at least 1")]
    ZeroLoginDeadline,

    #[error("auth.escalation.threshold must be at least 1")]
    ZeroEscalationThreshold,

    #[error("auth.escalation.{field} must be at least 1 minute")]
    ZeroBanDuration { field: &'static str },

    #[error("moderation.default_mute_minutes must be -1 (permanent) or >= 1, got {0}")]
    InvalidMuteDuration(i64),

    #[error("storage.backend must be \"json\" or \"sqlite\", got '{0}'")]
    UnknownBackend(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.auth.login_deadline_secs == Some(0) {
        errors.push(ValidationError::ZeroLoginDeadline);
    }

    let esc = &config.auth.escalation;
    if esc.threshold == Some(0) {
        errors.push(ValidationError::ZeroEscalationThreshold);
    }
    if esc.short_ban_minutes == Some(0) {
        errors.push(ValidationError::ZeroBanDuration {
            field: "short_ban_minutes",
        });
    }
    if esc.long_ban_minutes == Some(0) {
        errors.push(ValidationError::ZeroBanDuration {
            field: "long_ban_minutes",
        });
    }

    if let Some(mute) = config.moderation.default_mute_minutes {
        if mute != -1 && mute < 1 {
            errors.push(ValidationError::InvalidMuteDuration(mute));
        }
    }

    if let Some(backend) = &config.storage.backend {
        if backend != "json" && backend != "sqlite" {
            errors.push(ValidationError::UnknownBackend(backend.clone()));
        }
    }

    errors
}
