//! Line-delimited JSON protocol over the Unix socket
//!
//! One request or response per line. The game-server plugin is the only
//! expected client; it forwards connect/disconnect lifecycle events and
//! player commands, and subscribes to receive kick events pushed by the
//! engine (deadline expiry, escalation bans).

use serde::{Deserialize, Serialize};
use warden_core::{AuthError, EngineEvent, ModerationStatus, SessionState};
use warden_store::AuditEvent;
use warden_util::PlayerId;

/// A request from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Player connection opened
    Connect {
        player_id: PlayerId,
        display_name: String,
    },
    /// Player connection closed
    Disconnect { player_id: PlayerId },
    Register {
        player_id: PlayerId,
        password: String,
        confirm: String,
    },
    Login {
        player_id: PlayerId,
        password: String,
    },
    /// Gate check for commands and chat
    IsAuthenticated { player_id: PlayerId },
    /// Mute/ban/warn standing for an identity
    Status { player_id: PlayerId },
    Ban {
        player_id: PlayerId,
        /// Minutes, or -1 for permanent
        minutes: i64,
        reason: Option<String>,
    },
    Unban { player_id: PlayerId },
    Mute {
        player_id: PlayerId,
        /// Defaults to the configured mute duration when omitted
        minutes: Option<i64>,
    },
    Unmute { player_id: PlayerId },
    Warn { player_id: PlayerId },
    Unwarn { player_id: PlayerId },
    Kick {
        player_id: PlayerId,
        reason: Option<String>,
    },
    /// Delete an identity's record, kicking it if connected
    PurgeRecord { player_id: PlayerId },
    /// Receive pushed `Event` lines on this connection
    SubscribeEvents,
    RecentAudits { limit: usize },
    Ping,
}

/// A response to a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub request_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            payload: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResponsePayload {
    Connected { state: SessionState },
    Disconnected { was_connected: bool },
    Registered,
    LoggedIn { already: bool },
    Authenticated { authenticated: bool },
    Status(ModerationStatus),
    Moderated(ModerationStatus),
    Kicked,
    Purged,
    Subscribed,
    Audits(Vec<AuditEvent>),
    Pong,
}

/// An event pushed to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EngineEvent,
}

impl Event {
    pub fn new(payload: EngineEvent) -> Self {
        Self { payload }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotConnected,
    NotRegistered,
    AlreadyRegistered,
    AlreadyAuthenticated,
    PasswordMismatch,
    IncorrectPassword,
    Banned,
    HashingUnavailable,
    UnknownPlayer,
    AlreadyMuted,
    InvalidRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    /// Remaining ban minutes, when `code` is `banned`; absent means
    /// permanent for a ban error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            remaining_minutes: None,
            attempts: None,
        }
    }
}

impl From<&AuthError> for ErrorInfo {
    fn from(err: &AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::NotConnected => ErrorInfo::new(ErrorCode::NotConnected, message),
            AuthError::NotRegistered => ErrorInfo::new(ErrorCode::NotRegistered, message),
            AuthError::AlreadyRegistered => ErrorInfo::new(ErrorCode::AlreadyRegistered, message),
            AuthError::AlreadyAuthenticated => {
                ErrorInfo::new(ErrorCode::AlreadyAuthenticated, message)
            }
            AuthError::PasswordMismatch => ErrorInfo::new(ErrorCode::PasswordMismatch, message),
            AuthError::IncorrectPassword { attempts, .. } => ErrorInfo {
                attempts: Some(*attempts),
                ..ErrorInfo::new(ErrorCode::IncorrectPassword, message)
            },
            AuthError::HashingUnavailable(_) => {
                ErrorInfo::new(ErrorCode::HashingUnavailable, message)
            }
            AuthError::Banned {
                remaining_minutes, ..
            } => ErrorInfo {
                remaining_minutes: *remaining_minutes,
                ..ErrorInfo::new(ErrorCode::Banned, message)
            },
        }
    }
}
