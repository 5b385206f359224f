//! Failed-login escalation ladder
//!
//! Below the threshold a failed attempt just burns one try. Hitting the
//! threshold earns a short ban, one past it a long ban, and anything
//! beyond that is permanent. The counts are evaluated after the failed
//! attempt has been recorded, so `attempts` is the new total.

use warden_config::EscalationPolicy;

/// Ban length chosen by the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanTerm {
    Minutes(u32),
    Permanent,
}

impl BanTerm {
    /// The stored duration encoding: minutes, or -1 for permanent
    pub fn as_minutes(&self) -> i64 {
        match self {
            BanTerm::Minutes(m) => i64::from(*m),
            BanTerm::Permanent => crate::sanction::PERMANENT,
        }
    }
}

/// What to do after a failed login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionDirective {
    /// Still under the threshold; report attempts used out of the limit
    AllowRetry { attempts: u32, limit: u32 },
    Ban(BanTerm),
}

/// Apply the ladder to the post-increment attempt count
pub fn decide(attempts: u32, policy: &EscalationPolicy) -> SanctionDirective {
    if attempts < policy.threshold {
        SanctionDirective::AllowRetry {
            attempts,
            limit: policy.threshold,
        }
    } else if attempts == policy.threshold {
        SanctionDirective::Ban(BanTerm::Minutes(policy.short_ban_minutes))
    } else if attempts == policy.threshold + 1 {
        SanctionDirective::Ban(BanTerm::Minutes(policy.long_ban_minutes))
    } else {
        SanctionDirective::Ban(BanTerm::Permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EscalationPolicy {
        EscalationPolicy {
            threshold: 5,
            short_ban_minutes: 5,
            long_ban_minutes: 1440,
        }
    }

    #[test]
    fn below_threshold_allows_retry() {
        for attempts in 1..5 {
            assert_eq!(
                decide(attempts, &policy()),
                SanctionDirective::AllowRetry { attempts, limit: 5 }
            );
        }
    }

    #[test]
    fn threshold_earns_short_ban() {
        assert_eq!(
            decide(5, &policy()),
            SanctionDirective::Ban(BanTerm::Minutes(5))
        );
    }

    #[test]
    fn one_past_threshold_earns_long_ban() {
        assert_eq!(
            decide(6, &policy()),
            SanctionDirective::Ban(BanTerm::Minutes(1440))
        );
    }

    #[test]
    fn beyond_that_is_permanent() {
        for attempts in [7, 8, 20, u32::MAX] {
            assert_eq!(
                decide(attempts, &policy()),
                SanctionDirective::Ban(BanTerm::Permanent)
            );
        }
    }

    #[test]
    fn ban_term_minutes_encoding() {
        assert_eq!(BanTerm::Minutes(1440).as_minutes(), 1440);
        assert_eq!(BanTerm::Permanent.as_minutes(), -1);
    }
}
