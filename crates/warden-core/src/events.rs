//! Events emitted by the engine for the host to act on

use serde::{Deserialize, Serialize};
use warden_util::PlayerId;

/// Why a connection is being terminated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KickReason {
    /// The login deadline passed without authentication
    LoginTimeout,
    /// Banned, by escalation or by a moderator. `minutes` is the stored
    /// duration encoding (-1 for permanent).
    Banned {
        minutes: i64,
        reason: Option<String>,
    },
    /// A moderator removed the player without a ban
    Removed { reason: Option<String> },
}

/// An effect the engine wants the host to apply.
///
/// The engine never touches connections itself; it returns these and
/// the control loop carries them out. State is already persisted by the
/// time an event is emitted, so a crash between the two loses at most
/// the disconnect, never the sanction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Kick {
        player_id: PlayerId,
        display_name: String,
        reason: KickReason,
    },
}
