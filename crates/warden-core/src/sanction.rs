//! Sanction window evaluation
//!
//! Durations are stored in minutes with two sentinel values: `0` means
//! no sanction and `-1` means permanent. A timed sanction covers the
//! half-open window `[started_at, started_at + minutes)`: a sanction
//! started at t with duration d is no longer active once d whole
//! minutes have elapsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_store::PlayerRecord;
use warden_util::elapsed_minutes;

/// Duration sentinel for a permanent sanction
pub const PERMANENT: i64 = -1;

/// Outcome of evaluating one sanction field against the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SanctionState {
    /// No sanction recorded
    None,
    /// Active with a known number of whole minutes remaining (at least 1)
    Active { remaining_minutes: i64 },
    /// Active with no expiry
    Permanent,
    /// A timed sanction whose window has elapsed
    Expired,
}

impl SanctionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SanctionState::Active { .. } | SanctionState::Permanent)
    }
}

/// Evaluate a (minutes, started_at) pair at the given instant.
///
/// A positive duration with no start timestamp is treated as no
/// sanction; the window cannot be located on the timeline, so the
/// player is given the benefit of the doubt rather than being locked
/// out indefinitely.
pub fn evaluate(
    minutes: i64,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SanctionState {
    match minutes {
        0 => SanctionState::None,
        PERMANENT => SanctionState::Permanent,
        d if d > 0 => {
            if started_at.is_none() {
                return SanctionState::None;
            }
            match remaining(d, started_at, now) {
                0 => SanctionState::Expired,
                left => SanctionState::Active {
                    remaining_minutes: left,
                },
            }
        }
        // negative values other than the permanent sentinel
        _ => SanctionState::None,
    }
}

/// Minutes left on a timed sanction, clamped to zero. Callers must
/// special-case the permanent sentinel before asking; a missing start
/// timestamp reports zero.
pub fn remaining(
    minutes: i64,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let Some(started_at) = started_at else {
        return 0;
    };
    (minutes - elapsed_minutes(started_at, now)).max(0)
}

pub fn ban_state(record: &PlayerRecord, now: DateTime<Utc>) -> SanctionState {
    evaluate(record.ban_minutes, record.ban_started_at, now)
}

pub fn mute_state(record: &PlayerRecord, now: DateTime<Utc>) -> SanctionState {
    evaluate(record.mute_minutes, record.mute_started_at, now)
}

pub fn is_banned(record: &PlayerRecord, now: DateTime<Utc>) -> bool {
    ban_state(record, now).is_active()
}

pub fn is_muted(record: &PlayerRecord, now: DateTime<Utc>) -> bool {
    mute_state(record, now).is_active()
}

/// Combined view of a player's standing, for status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationStatus {
    pub display_name: String,
    pub registered: bool,
    pub warn_count: u32,
    pub ban: SanctionState,
    pub mute: SanctionState,
    pub ban_reason: Option<String>,
}

impl ModerationStatus {
    pub fn of(record: &PlayerRecord, now: DateTime<Utc>) -> Self {
        Self {
            display_name: record.display_name.clone(),
            registered: record.is_registered(),
            warn_count: record.warn_count,
            ban: ban_state(record, now),
            mute: mute_state(record, now),
            ban_reason: record.ban_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(now: DateTime<Utc>, minutes_ago: i64) -> Option<DateTime<Utc>> {
        Some(now - Duration::minutes(minutes_ago))
    }

    #[test]
    fn zero_minutes_is_no_sanction() {
        let now = Utc::now();
        assert_eq!(evaluate(0, at(now, 10), now), SanctionState::None);
    }

    #[test]
    fn permanent_ignores_start_timestamp() {
        let now = Utc::now();
        assert_eq!(evaluate(PERMANENT, None, now), SanctionState::Permanent);
        assert_eq!(evaluate(PERMANENT, at(now, 99999), now), SanctionState::Permanent);
    }

    #[test]
    fn timed_sanction_active_inside_window() {
        let now = Utc::now();
        assert_eq!(
            evaluate(5, at(now, 3), now),
            SanctionState::Active { remaining_minutes: 2 }
        );
    }

    #[test]
    fn timed_sanction_expires_at_boundary() {
        let now = Utc::now();
        // exactly 5 whole minutes elapsed: window is half-open, so expired
        assert_eq!(evaluate(5, at(now, 5), now), SanctionState::Expired);
    }

    #[test]
    fn boundary_second_before_expiry_is_active() {
        let start = Utc::now();
        let just_before = start + Duration::minutes(4) + Duration::seconds(59);
        assert_eq!(
            evaluate(5, Some(start), just_before),
            SanctionState::Active { remaining_minutes: 1 }
        );
    }

    #[test]
    fn remaining_clamps_to_zero_after_expiry() {
        let now = Utc::now();
        assert_eq!(remaining(5, at(now, 3), now), 2);
        assert_eq!(remaining(5, at(now, 5), now), 0);
        assert_eq!(remaining(5, at(now, 500), now), 0);
        assert_eq!(remaining(5, None, now), 0);
    }

    #[test]
    fn positive_minutes_without_start_is_no_sanction() {
        let now = Utc::now();
        assert_eq!(evaluate(30, None, now), SanctionState::None);
    }

    #[test]
    fn unrecognized_negative_duration_is_no_sanction() {
        let now = Utc::now();
        assert_eq!(evaluate(-7, at(now, 1), now), SanctionState::None);
    }

    #[test]
    fn start_in_future_counts_full_duration() {
        // clock skew: a start timestamp ahead of now clamps elapsed to 0
        let now = Utc::now();
        let future = Some(now + Duration::minutes(2));
        assert_eq!(
            evaluate(5, future, now),
            SanctionState::Active { remaining_minutes: 5 }
        );
    }

    #[test]
    fn record_helpers_read_the_right_fields() {
        let now = Utc::now();
        let mut record = PlayerRecord::new("Steve");
        record.ban_minutes = PERMANENT;
        record.mute_minutes = 10;
        record.mute_started_at = at(now, 4);

        assert!(is_banned(&record, now));
        assert!(is_muted(&record, now));

        let status = ModerationStatus::of(&record, now);
        assert_eq!(status.ban, SanctionState::Permanent);
        assert_eq!(status.mute, SanctionState::Active { remaining_minutes: 6 });
        assert!(!status.registered);
    }
}
