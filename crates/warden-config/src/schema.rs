//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Authentication settings
    #[serde(default)]
    pub auth: RawAuthConfig,

    /// Moderation defaults
    #[serde(default)]
    pub moderation: RawModerationConfig,

    /// Storage backend settings
    #[serde(default)]
    pub storage: RawStorageConfig,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Authentication settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAuthConfig {
    /// Seconds a connected player has to register or log in before
    /// being kicked (default: 300)
    pub login_deadline_secs: Option<u64>,

    /// Failed-attempt escalation tuning
    #[serde(default)]
    pub escalation: RawEscalationConfig,
}

/// Failed-attempt escalation tuning.
///
/// The three-tier shape (short ban, long ban, permanent) is fixed
/// behavior; only the threshold and the two finite durations are data.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEscalationConfig {
    /// Failed attempts at which the first ban is applied (default: 5)
    pub threshold: Option<u32>,

    /// Ban length in minutes at the threshold (default: 5)
    pub short_ban_minutes: Option<u32>,

    /// Ban length in minutes one attempt past the threshold (default: 1440)
    pub long_ban_minutes: Option<u32>,
}

/// Moderation defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawModerationConfig {
    /// Duration applied by the mute command when none is given:
    /// -1 = permanent, otherwise minutes (default: -1)
    pub default_mute_minutes: Option<i64>,
}

/// Storage backend settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStorageConfig {
    /// "json" (one file per player) or "sqlite" (default: "json")
    pub backend: Option<String>,

    /// Data directory for records and the audit log
    pub data_dir: Option<PathBuf>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,
}
