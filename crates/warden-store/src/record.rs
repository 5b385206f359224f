//! The per-identity durable record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One durable record per identity.
///
/// Sanction durations use a shared encoding: `0` = no sanction, `-1` =
/// permanent, `> 0` = minutes measured from the matching `*_started_at`
/// timestamp. A duration of `0` means the start timestamp is ignored.
///
/// Timestamps serialize as epoch milliseconds so the on-disk layout is
/// backend-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Last-known human-readable name, informational only
    pub display_name: String,

    /// One-way digest of the password; absent means not registered
    #[serde(default)]
    pub credential_hash: Option<String>,

    /// Cumulative non-expiring warning counter
    #[serde(default)]
    pub warn_count: u32,

    /// Time of the most recent warning (informational, not a window)
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub warn_started_at: Option<DateTime<Utc>>,

    /// Mute duration: 0 = none, -1 = permanent, > 0 = minutes
    #[serde(default)]
    pub mute_minutes: i64,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub mute_started_at: Option<DateTime<Utc>>,

    /// Ban duration, same encoding as `mute_minutes`
    #[serde(default)]
    pub ban_minutes: i64,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub ban_started_at: Option<DateTime<Utc>>,

    /// Reason given when the ban was applied, reported on rejected joins
    #[serde(default)]
    pub ban_reason: Option<String>,

    /// Consecutive failed logins; reset on any successful login or
    /// registration
    #[serde(default)]
    pub failed_login_attempts: u32,
}

impl PlayerRecord {
    /// Fresh record for an identity seen for the first time.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            credential_hash: None,
            warn_count: 0,
            warn_started_at: None,
            mute_minutes: 0,
            mute_started_at: None,
            ban_minutes: 0,
            ban_started_at: None,
            ban_reason: None,
            failed_login_attempts: 0,
        }
    }

    /// An identity is registered once a credential hash is stored.
    pub fn is_registered(&self) -> bool {
        self.credential_hash.is_some()
    }

    /// Drop the ban fields (duration, start, reason) in one step.
    pub fn clear_ban(&mut self) {
        self.ban_minutes = 0;
        self.ban_started_at = None;
        self.ban_reason = None;
    }

    /// Drop the mute fields in one step.
    pub fn clear_mute(&mut self) {
        self.mute_minutes = 0;
        self.mute_started_at = None;
    }
}
