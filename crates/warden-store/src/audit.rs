//! Audit event types
//!
//! The audit log is append-only; it is what retains sanction history
//! after a ban or mute is cleared from the record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_util::PlayerId;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Identity completed registration
    PlayerRegistered { player_id: PlayerId },

    /// Wrong password submitted
    LoginFailed { player_id: PlayerId, attempts: u32 },

    /// Ban applied (minutes: -1 = permanent)
    BanApplied {
        player_id: PlayerId,
        minutes: i64,
        reason: Option<String>,
        escalated: bool,
    },

    /// Ban cleared
    BanCleared { player_id: PlayerId },

    /// Mute applied (minutes: -1 = permanent)
    MuteApplied { player_id: PlayerId, minutes: i64 },

    /// Mute cleared
    MuteCleared { player_id: PlayerId },

    /// Warning counter incremented
    WarnAdded { player_id: PlayerId, warn_count: u32 },

    /// Warning counter decremented
    WarnRemoved { player_id: PlayerId, warn_count: u32 },

    /// Identity kicked (login deadline, escalation, or moderator)
    PlayerKicked { player_id: PlayerId, reason: String },

    /// Stored record deleted entirely
    RecordPurged { player_id: PlayerId },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Backend-assigned sequence number (0 until appended)
    #[serde(default)]
    pub id: i64,

    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// What happened
    #[serde(flatten)]
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            event,
        }
    }

    /// Event stamped with an injected time (used by the engine so audit
    /// timestamps match the `now` the decision was made with).
    pub fn at(timestamp: DateTime<Utc>, event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_tag() {
        let event = AuditEvent::new(AuditEventType::BanApplied {
            player_id: PlayerId::new(),
            minutes: -1,
            reason: Some("griefing".into()),
            escalated: false,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ban_applied");
        assert_eq!(json["minutes"], -1);
    }
}
