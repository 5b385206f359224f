//! Engine error taxonomy
//!
//! Every variant is a typed result for the command layer to turn into a
//! user-facing message; none of them should take down the control loop.
//! Storage failures are not represented here because saves are
//! best-effort (logged, memory stays authoritative).

use thiserror::Error;

use crate::auth::HashingUnavailable;

fn banned_message(remaining_minutes: &Option<i64>, reason: &Option<String>) -> String {
    let span = match remaining_minutes {
        Some(m) => format!("{m} minutes remaining"),
        None => "permanent".to_string(),
    };
    match reason {
        Some(r) => format!("{span}: {r}"),
        None => span,
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity has no live connection tracked by the engine
    #[error("no active connection for this identity")]
    NotConnected,

    #[error("no credential registered for this identity")]
    NotRegistered,

    #[error("a credential is already registered for this identity")]
    AlreadyRegistered,

    #[error("already authenticated")]
    AlreadyAuthenticated,

    #[error("password and confirmation do not match")]
    PasswordMismatch,

    #[error("incorrect password, attempt {attempts} of {limit}")]
    IncorrectPassword { attempts: u32, limit: u32 },

    /// Hashing is an environment fault, not user error; the daemon
    /// logs it loudly since no login or registration can succeed.
    #[error(transparent)]
    HashingUnavailable(#[from] HashingUnavailable),

    /// `remaining_minutes` is `None` for a permanent ban.
    #[error("banned ({})", banned_message(.remaining_minutes, .reason))]
    Banned {
        minutes: i64,
        remaining_minutes: Option<i64>,
        reason: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banned_messages_cover_both_forms() {
        let timed = AuthError::Banned {
            minutes: 5,
            remaining_minutes: Some(3),
            reason: Some("too many failed logins".into()),
        };
        assert_eq!(
            timed.to_string(),
            "banned (3 minutes remaining: too many failed logins)"
        );

        let permanent = AuthError::Banned {
            minutes: -1,
            remaining_minutes: None,
            reason: None,
        };
        assert_eq!(permanent.to_string(), "banned (permanent)");
    }
}
