//! Time utilities for wardend
//!
//! Sanction windows are reasoned about in wall-clock time (minutes since
//! a recorded start timestamp), while login deadlines use monotonic time
//! so a clock step can neither extend nor cut short a pending kick.
//!
//! Engine and evaluator code never reads the clock itself; `now` and
//! `now_mono` are passed in by the caller so tests can inject fixed or
//! advancing time.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Get the current wall-clock time.
///
/// The daemon calls this at its event-loop edges; everything below takes
/// the result as a parameter.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole minutes elapsed between `started_at` and `now`, saturating to
/// zero if `now` is earlier (clock stepped backwards between saves).
pub fn elapsed_minutes(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let minutes = (now - started_at).num_minutes();
    if minutes < 0 {
        tracing::warn!(%started_at, %now, "Clock went backwards, clamping elapsed time to zero");
    }
    minutes.max(0)
}

/// Represents a point in monotonic time for deadline enforcement.
/// This is immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_elapsed_minutes() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 6, 1, 12, 4, 59).unwrap();
        assert_eq!(elapsed_minutes(start, later), 4);

        let exact = Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap();
        assert_eq!(elapsed_minutes(start, exact), 5);
    }

    #[test]
    fn test_elapsed_minutes_clock_step_back() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();
        assert_eq!(elapsed_minutes(start, earlier), 0);
    }

    #[test]
    fn test_monotonic_ordering_with_add() {
        let t1 = MonotonicInstant::now();
        let t2 = t1 + Duration::from_secs(30);
        assert!(t2 > t1);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }
}
