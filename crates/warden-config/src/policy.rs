//! Validated policy structures

use crate::schema::RawConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Validated policy ready for use by the session engine
#[derive(Debug, Clone)]
pub struct Policy {
    pub auth: AuthPolicy,
    pub moderation: ModerationPolicy,
    pub storage: StoragePolicy,
    pub service: ServiceConfig,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            auth: AuthPolicy {
                login_deadline: Duration::from_secs(
                    raw.auth.login_deadline_secs.unwrap_or(300),
                ),
                escalation: EscalationPolicy {
                    threshold: raw.auth.escalation.threshold.unwrap_or(5),
                    short_ban_minutes: raw.auth.escalation.short_ban_minutes.unwrap_or(5),
                    long_ban_minutes: raw.auth.escalation.long_ban_minutes.unwrap_or(1440),
                },
            },
            moderation: ModerationPolicy {
                default_mute_minutes: raw.moderation.default_mute_minutes.unwrap_or(-1),
            },
            storage: StoragePolicy {
                backend: match raw.storage.backend.as_deref() {
                    Some("sqlite") => StorageBackend::Sqlite,
                    // validation already rejected anything else
                    _ => StorageBackend::Json,
                },
                data_dir: raw
                    .storage
                    .data_dir
                    .unwrap_or_else(warden_util::default_data_dir),
            },
            service: ServiceConfig {
                socket_path: raw
                    .service
                    .socket_path
                    .unwrap_or_else(warden_util::default_socket_path),
            },
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            auth: Default::default(),
            moderation: Default::default(),
            storage: Default::default(),
            service: Default::default(),
        })
    }
}

/// Authentication policy
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// How long a connected player may stay unauthenticated before the
    /// deadline task kicks them
    pub login_deadline: Duration,

    /// Failed-attempt escalation tiers
    pub escalation: EscalationPolicy,
}

/// Failed-attempt escalation tiers.
///
/// Attempts below `threshold` are allowed to retry; at `threshold` a
/// short ban is applied, at `threshold + 1` a long ban, and past that a
/// permanent ban.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub threshold: u32,
    pub short_ban_minutes: u32,
    pub long_ban_minutes: u32,
}

/// Moderation defaults
#[derive(Debug, Clone)]
pub struct ModerationPolicy {
    /// -1 = permanent, otherwise minutes
    pub default_mute_minutes: i64,
}

/// Storage backend choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Json,
    Sqlite,
}

/// Storage policy
#[derive(Debug, Clone)]
pub struct StoragePolicy {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
}
