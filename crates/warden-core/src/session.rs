//! Per-connection session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_util::PlayerId;

/// Where a connected identity stands in the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Connected with no stored credential; must register
    AwaitingRegistration,
    /// Connected with a stored credential; must log in
    AwaitingLogin,
    /// Passed the gate
    Authenticated,
}

/// A live connection being tracked by the engine
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub display_name: String,
    pub state: SessionState,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        player_id: PlayerId,
        display_name: impl Into<String>,
        state: SessionState,
        connected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            state,
            connected_at,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }
}
