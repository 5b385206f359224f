//! Login deadline tracking
//!
//! At most one pending deadline per identity. Scheduling again for the
//! same identity replaces the earlier deadline, so a reconnect can
//! never leave a stale timer behind. Deadlines are held against the
//! monotonic clock and drained by the control loop's tick; firing
//! happens on the same thread as every other state change, so a fired
//! deadline always observes the identity's current state.

use std::collections::HashMap;
use std::time::Duration;
use warden_util::{MonotonicInstant, PlayerId};

#[derive(Debug, Default)]
pub struct DeadlineScheduler {
    pending: HashMap<PlayerId, MonotonicInstant>,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the deadline for an identity.
    pub fn schedule(&mut self, player_id: PlayerId, now_mono: MonotonicInstant, after: Duration) {
        self.pending.insert(player_id, now_mono + after);
    }

    /// Disarm an identity's deadline. A no-op when none is pending.
    pub fn cancel(&mut self, player_id: PlayerId) -> bool {
        self.pending.remove(&player_id).is_some()
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Remove and return every identity whose deadline has passed.
    pub fn due(&mut self, now_mono: MonotonicInstant) -> Vec<PlayerId> {
        let fired: Vec<PlayerId> = self
            .pending
            .iter()
            .filter(|(_, fire_at)| now_mono >= **fire_at)
            .map(|(id, _)| *id)
            .collect();
        for id in &fired {
            self.pending.remove(id);
        }
        fired
    }

    pub fn is_pending(&self, player_id: PlayerId) -> bool {
        self.pending.contains_key(&player_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
