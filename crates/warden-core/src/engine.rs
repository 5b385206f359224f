//! Session gate engine
//!
//! Owns every session transition and every record mutation. The daemon
//! drives it from a single control loop; the engine itself never spawns
//! tasks or touches connections, it just mutates state, persists, and
//! returns typed results plus `EngineEvent`s for the host to carry out.
//!
//! Ordering rule for sanctions: the record change is persisted before
//! any kick event leaves the engine, so a crash in between can lose the
//! disconnect but never the sanction.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_config::Policy;
use warden_store::{AuditEvent, AuditEventType, PlayerRecord, RecordStore};
use warden_util::{MonotonicInstant, PlayerId};

use crate::auth::CredentialHasher;
use crate::deadline::DeadlineScheduler;
use crate::error::AuthError;
use crate::escalation::{self, BanTerm, SanctionDirective};
use crate::events::{EngineEvent, KickReason};
use crate::sanction::{self, ModerationStatus, SanctionState};
use crate::session::{Session, SessionState};

/// Successful login result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// Repeated login from an authenticated session; accepted as a no-op
    AlreadyLoggedIn,
}

/// Result of a mute request
#[derive(Debug, Clone)]
pub enum MuteOutcome {
    Applied(ModerationStatus),
    /// A mute was already running; the existing window is left as-is
    AlreadyMuted(ModerationStatus),
}

pub struct SessionEngine {
    policy: Policy,
    store: Arc<RecordStore>,
    hasher: Arc<dyn CredentialHasher>,
    sessions: HashMap<PlayerId, Session>,
    deadlines: DeadlineScheduler,
}

impl SessionEngine {
    pub fn new(policy: Policy, store: Arc<RecordStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        info!(
            login_deadline_secs = policy.auth.login_deadline.as_secs(),
            escalation_threshold = policy.auth.escalation.threshold,
            "Session engine initialized"
        );

        store.audit(AuditEvent::new(AuditEventType::ServiceStarted));

        Self {
            policy,
            store,
            hasher,
            sessions: HashMap::new(),
            deadlines: DeadlineScheduler::new(),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// A new connection for `player_id`. Rejects banned identities
    /// before any session state is created.
    pub fn connect(
        &mut self,
        player_id: PlayerId,
        display_name: &str,
        now: DateTime<Utc>,
        now_mono: MonotonicInstant,
    ) -> Result<SessionState, AuthError> {
        let record = match self.store.get(player_id) {
            Some(record) => record,
            None => {
                let record = PlayerRecord::new(display_name);
                self.store.upsert(player_id, record.clone());
                record
            }
        };

        match sanction::ban_state(&record, now) {
            SanctionState::Active { remaining_minutes } => {
                debug!(%player_id, remaining_minutes, "Connection rejected, banned");
                return Err(AuthError::Banned {
                    minutes: record.ban_minutes,
                    remaining_minutes: Some(remaining_minutes),
                    reason: record.ban_reason,
                });
            }
            SanctionState::Permanent => {
                debug!(%player_id, "Connection rejected, permanently banned");
                return Err(AuthError::Banned {
                    minutes: record.ban_minutes,
                    remaining_minutes: None,
                    reason: record.ban_reason,
                });
            }
            SanctionState::Expired => {
                // lazily retire the spent ban so status queries stay clean
                self.store.update(player_id, |r| r.clear_ban());
                self.store.save_one(player_id);
            }
            SanctionState::None => {}
        }

        // keep the stored display name current
        if record.display_name != display_name {
            self.store
                .update(player_id, |r| r.display_name = display_name.to_string());
        }

        if self.sessions.contains_key(&player_id) {
            warn!(%player_id, "Connect for an identity with a live session, replacing it");
        }

        // registered or not, the identity has the same window to
        // authenticate before the connection is dropped
        self.deadlines
            .schedule(player_id, now_mono, self.policy.auth.login_deadline);
        let state = if record.is_registered() {
            SessionState::AwaitingLogin
        } else {
            SessionState::AwaitingRegistration
        };

        self.sessions
            .insert(player_id, Session::new(player_id, display_name, state, now));

        info!(%player_id, display_name, state = ?state, "Player connected");
        Ok(state)
    }

    /// First-time credential registration.
    pub fn register(
        &mut self,
        player_id: PlayerId,
        password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let session = self.sessions.get(&player_id).ok_or(AuthError::NotConnected)?;

        match session.state {
            SessionState::Authenticated => return Err(AuthError::AlreadyAuthenticated),
            SessionState::AwaitingLogin => return Err(AuthError::AlreadyRegistered),
            SessionState::AwaitingRegistration => {}
        }

        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let hash = self.hasher.hash(password)?;

        self.store.update(player_id, |r| {
            r.credential_hash = Some(hash);
            r.failed_login_attempts = 0;
        });
        self.store.save_one(player_id);
        self.deadlines.cancel(player_id);
        self.authenticate(player_id);

        self.store
            .audit(AuditEvent::new(AuditEventType::PlayerRegistered { player_id }));
        info!(%player_id, "Player registered");
        Ok(())
    }

    /// Authenticate against the stored credential. A wrong password
    /// burns an attempt; the attempt count is persisted before the
    /// escalation ladder is consulted.
    pub fn login(
        &mut self,
        player_id: PlayerId,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let session = self.sessions.get(&player_id).ok_or(AuthError::NotConnected)?;

        if session.state == SessionState::Authenticated {
            return Ok(LoginOutcome::AlreadyLoggedIn);
        }

        let record = self.store.get(player_id).ok_or(AuthError::NotRegistered)?;
        let Some(stored_hash) = record.credential_hash.as_deref() else {
            return Err(AuthError::NotRegistered);
        };

        if self.hasher.verify(password, stored_hash)? {
            self.store
                .update(player_id, |r| r.failed_login_attempts = 0);
            self.store.save_one(player_id);
            self.deadlines.cancel(player_id);
            self.authenticate(player_id);
            info!(%player_id, "Player logged in");
            return Ok(LoginOutcome::LoggedIn);
        }

        let attempts = self
            .store
            .update(player_id, |r| r.failed_login_attempts += 1)
            .map(|r| r.failed_login_attempts)
            .unwrap_or(0);
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::at(now, AuditEventType::LoginFailed {
            player_id,
            attempts,
        }));

        match escalation::decide(attempts, &self.policy.auth.escalation) {
            SanctionDirective::AllowRetry { attempts, limit } => {
                debug!(%player_id, attempts, limit, "Login failed");
                Err(AuthError::IncorrectPassword { attempts, limit })
            }
            SanctionDirective::Ban(term) => Err(self.apply_escalation_ban(player_id, term, attempts, now)),
        }
    }

    fn apply_escalation_ban(
        &mut self,
        player_id: PlayerId,
        term: BanTerm,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> AuthError {
        let minutes = term.as_minutes();
        let reason = format!("too many failed login attempts ({attempts})");

        self.store.update(player_id, |r| {
            r.ban_minutes = minutes;
            r.ban_started_at = Some(now);
            r.ban_reason = Some(reason.clone());
        });
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::at(now, AuditEventType::BanApplied {
            player_id,
            minutes,
            reason: Some(reason.clone()),
            escalated: true,
        }));

        self.deadlines.cancel(player_id);
        self.sessions.remove(&player_id);

        warn!(%player_id, attempts, minutes, "Escalation ban applied");

        let remaining_minutes = match term {
            BanTerm::Minutes(m) => Some(i64::from(m)),
            BanTerm::Permanent => None,
        };
        AuthError::Banned {
            minutes,
            remaining_minutes,
            reason: Some(reason),
        }
    }

    /// Connection closed. Safe to call twice; the second call finds no
    /// session and does nothing, so nothing is double-saved.
    pub fn disconnect(&mut self, player_id: PlayerId) -> bool {
        let Some(_session) = self.sessions.remove(&player_id) else {
            return false;
        };

        self.deadlines.cancel(player_id);
        self.store.save_one(player_id);
        debug!(%player_id, "Player disconnected");
        true
    }

    /// Drive pending deadlines. An identity that authenticated after
    /// its deadline was armed is skipped; the check reads the session's
    /// current state at fire time, so that race always resolves in
    /// favor of the completed login.
    pub fn tick(&mut self, now_mono: MonotonicInstant) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        for player_id in self.deadlines.due(now_mono) {
            let Some(session) = self.sessions.get(&player_id) else {
                continue;
            };
            if session.is_authenticated() {
                debug!(%player_id, "Deadline fired after authentication, ignored");
                continue;
            }

            let display_name = session.display_name.clone();
            self.sessions.remove(&player_id);
            self.store.save_one(player_id);
            self.store.audit(AuditEvent::new(AuditEventType::PlayerKicked {
                player_id,
                reason: "login deadline expired".into(),
            }));

            info!(%player_id, "Login deadline expired, kicking");
            events.push(EngineEvent::Kick {
                player_id,
                display_name,
                reason: KickReason::LoginTimeout,
            });
        }

        events
    }

    pub fn is_authenticated(&self, player_id: PlayerId) -> bool {
        self.sessions
            .get(&player_id)
            .is_some_and(Session::is_authenticated)
    }

    pub fn session_state(&self, player_id: PlayerId) -> Option<SessionState> {
        self.sessions.get(&player_id).map(|s| s.state)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Moderation: ban an identity. Persists before the kick event is
    /// returned. `None` when the identity has no record at all.
    pub fn apply_ban(
        &mut self,
        player_id: PlayerId,
        minutes: i64,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<(ModerationStatus, Option<EngineEvent>)> {
        let record = self.store.update(player_id, |r| {
            r.ban_minutes = minutes;
            r.ban_started_at = Some(now);
            r.ban_reason = reason.clone();
        })?;
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::at(now, AuditEventType::BanApplied {
            player_id,
            minutes,
            reason: reason.clone(),
            escalated: false,
        }));

        let event = self.sessions.remove(&player_id).map(|session| {
            self.deadlines.cancel(player_id);
            EngineEvent::Kick {
                player_id,
                display_name: session.display_name,
                reason: KickReason::Banned { minutes, reason },
            }
        });

        info!(%player_id, minutes, "Ban applied");
        Some((ModerationStatus::of(&record, now), event))
    }

    pub fn clear_ban(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> Option<ModerationStatus> {
        let record = self.store.update(player_id, PlayerRecord::clear_ban)?;
        self.store.save_one(player_id);
        self.store
            .audit(AuditEvent::at(now, AuditEventType::BanCleared { player_id }));
        info!(%player_id, "Ban cleared");
        Some(ModerationStatus::of(&record, now))
    }

    /// Moderation: mute. `minutes` uses the same encoding as bans;
    /// callers fall back to the configured default when unspecified.
    /// An already-active mute is reported untouched, never restarted
    /// or extended.
    pub fn apply_mute(
        &mut self,
        player_id: PlayerId,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> Option<MuteOutcome> {
        let existing = self.store.get(player_id)?;
        if sanction::mute_state(&existing, now).is_active() {
            debug!(%player_id, "Mute request for an already muted identity");
            return Some(MuteOutcome::AlreadyMuted(ModerationStatus::of(&existing, now)));
        }

        let record = self.store.update(player_id, |r| {
            r.mute_minutes = minutes;
            r.mute_started_at = Some(now);
        })?;
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::at(now, AuditEventType::MuteApplied {
            player_id,
            minutes,
        }));
        info!(%player_id, minutes, "Mute applied");
        Some(MuteOutcome::Applied(ModerationStatus::of(&record, now)))
    }

    pub fn clear_mute(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> Option<ModerationStatus> {
        let record = self.store.update(player_id, PlayerRecord::clear_mute)?;
        self.store.save_one(player_id);
        self.store
            .audit(AuditEvent::at(now, AuditEventType::MuteCleared { player_id }));
        info!(%player_id, "Mute cleared");
        Some(ModerationStatus::of(&record, now))
    }

    pub fn add_warn(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> Option<ModerationStatus> {
        let record = self.store.update(player_id, |r| {
            r.warn_count += 1;
            r.warn_started_at = Some(now);
        })?;
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::at(now, AuditEventType::WarnAdded {
            player_id,
            warn_count: record.warn_count,
        }));
        info!(%player_id, warn_count = record.warn_count, "Warn added");
        Some(ModerationStatus::of(&record, now))
    }

    pub fn remove_warn(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> Option<ModerationStatus> {
        let record = self.store.update(player_id, |r| {
            r.warn_count = r.warn_count.saturating_sub(1);
            if r.warn_count == 0 {
                r.warn_started_at = None;
            }
        })?;
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::at(now, AuditEventType::WarnRemoved {
            player_id,
            warn_count: record.warn_count,
        }));
        info!(%player_id, warn_count = record.warn_count, "Warn removed");
        Some(ModerationStatus::of(&record, now))
    }

    /// Moderation: remove a connected player without sanctioning them.
    pub fn kick(&mut self, player_id: PlayerId, reason: Option<String>) -> Option<EngineEvent> {
        let session = self.sessions.remove(&player_id)?;
        self.deadlines.cancel(player_id);
        self.store.save_one(player_id);
        self.store.audit(AuditEvent::new(AuditEventType::PlayerKicked {
            player_id,
            reason: reason.clone().unwrap_or_else(|| "kicked".into()),
        }));

        info!(%player_id, "Player kicked");
        Some(EngineEvent::Kick {
            player_id,
            display_name: session.display_name,
            reason: KickReason::Removed { reason },
        })
    }

    /// Moderation: delete an identity's record entirely, credentials
    /// and sanctions included. A live session is kicked first. `None`
    /// when no record exists; otherwise the kick events to carry out.
    pub fn purge_record(
        &mut self,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> Option<Vec<EngineEvent>> {
        let mut events = Vec::new();
        if let Some(session) = self.sessions.remove(&player_id) {
            self.deadlines.cancel(player_id);
            events.push(EngineEvent::Kick {
                player_id,
                display_name: session.display_name,
                reason: KickReason::Removed {
                    reason: Some("record purged".into()),
                },
            });
        }

        if !self.store.remove(player_id) {
            return None;
        }
        self.store
            .audit(AuditEvent::at(now, AuditEventType::RecordPurged { player_id }));
        info!(%player_id, "Record purged");
        Some(events)
    }

    pub fn moderation_status(
        &self,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> Option<ModerationStatus> {
        self.store
            .get(player_id)
            .map(|record| ModerationStatus::of(&record, now))
    }

    /// Recent audit events, most recent first.
    pub fn recent_audits(&self, limit: usize) -> Vec<AuditEvent> {
        self.store.recent_audits(limit)
    }

    /// Shutdown: disarm every deadline and flush every record.
    pub fn shutdown(&mut self) {
        let cancelled = self.deadlines.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "Pending deadlines cancelled");
        }
        self.sessions.clear();
        self.store.save_all();
        self.store.audit(AuditEvent::new(AuditEventType::ServiceStopped));
        info!("Session engine stopped");
    }

    fn authenticate(&mut self, player_id: PlayerId) {
        if let Some(session) = self.sessions.get_mut(&player_id) {
            session.state = SessionState::Authenticated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{HashingUnavailable, Sha256Hasher};
    use std::time::Duration;
    use warden_store::SqliteBackend;

    fn engine() -> SessionEngine {
        let store = Arc::new(RecordStore::new(Arc::new(
            SqliteBackend::in_memory().unwrap(),
        )));
        SessionEngine::new(Policy::default(), store, Arc::new(Sha256Hasher))
    }

    fn connect(engine: &mut SessionEngine, name: &str) -> (PlayerId, SessionState) {
        let id = PlayerId::new();
        let state = engine
            .connect(id, name, Utc::now(), MonotonicInstant::now())
            .unwrap();
        (id, state)
    }

    #[test]
    fn fresh_identity_registers_and_authenticates() {
        let mut engine = engine();
        let (id, state) = connect(&mut engine, "U1");
        assert_eq!(state, SessionState::AwaitingRegistration);

        engine.register(id, "pw", "pw").unwrap();

        assert!(engine.is_authenticated(id));
        let record = engine.store.get(id).unwrap();
        assert!(record.is_registered());
        assert_eq!(record.failed_login_attempts, 0);
        assert!(engine.deadlines.is_empty());
    }

    #[test]
    fn mismatched_confirmation_leaves_registration_pending() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U3");

        let err = engine.register(id, "a", "b").unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));

        assert_eq!(engine.session_state(id), Some(SessionState::AwaitingRegistration));
        assert!(engine.store.get(id).unwrap().credential_hash.is_none());
    }

    #[test]
    fn register_twice_is_rejected() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U1");
        engine.register(id, "pw", "pw").unwrap();

        assert!(matches!(
            engine.register(id, "pw", "pw"),
            Err(AuthError::AlreadyAuthenticated)
        ));

        // reconnect: stored credential now forces the login path
        engine.disconnect(id);
        let state = engine
            .connect(id, "U1", Utc::now(), MonotonicInstant::now())
            .unwrap();
        assert_eq!(state, SessionState::AwaitingLogin);
        assert!(matches!(
            engine.register(id, "pw", "pw"),
            Err(AuthError::AlreadyRegistered)
        ));
    }

    #[test]
    fn registered_identity_logs_in_and_attempts_reset() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U2");
        engine.register(id, "pw", "pw").unwrap();
        engine.disconnect(id);

        let now = Utc::now();
        let state = engine.connect(id, "U2", now, MonotonicInstant::now()).unwrap();
        assert_eq!(state, SessionState::AwaitingLogin);
        assert!(engine.deadlines.is_pending(id));

        // burn one attempt, then succeed
        assert!(matches!(
            engine.login(id, "wrong", now),
            Err(AuthError::IncorrectPassword { attempts: 1, limit: 5 })
        ));
        assert_eq!(engine.login(id, "pw", now).unwrap(), LoginOutcome::LoggedIn);

        assert!(engine.is_authenticated(id));
        assert_eq!(engine.store.get(id).unwrap().failed_login_attempts, 0);
        assert!(!engine.deadlines.is_pending(id));
    }

    #[test]
    fn login_when_authenticated_is_a_no_op() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U2");
        engine.register(id, "pw", "pw").unwrap();

        assert_eq!(
            engine.login(id, "anything", Utc::now()).unwrap(),
            LoginOutcome::AlreadyLoggedIn
        );
    }

    #[test]
    fn login_without_connection_or_credential_is_rejected() {
        let mut engine = engine();
        let now = Utc::now();

        assert!(matches!(
            engine.login(PlayerId::new(), "pw", now),
            Err(AuthError::NotConnected)
        ));

        let (id, _) = connect(&mut engine, "Fresh");
        assert!(matches!(engine.login(id, "pw", now), Err(AuthError::NotRegistered)));
    }

    #[test]
    fn escalation_ladder_bans_and_disconnects() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U2");
        engine.register(id, "pw", "pw").unwrap();
        engine.disconnect(id);

        let now = Utc::now();
        engine.connect(id, "U2", now, MonotonicInstant::now()).unwrap();

        // attempts 1..4: no sanction, count persists each time
        for expected in 1..=4u32 {
            let err = engine.login(id, "wrong", now).unwrap_err();
            assert!(matches!(
                err,
                AuthError::IncorrectPassword { attempts, limit: 5 } if attempts == expected
            ));
            let record = engine.store.get(id).unwrap();
            assert_eq!(record.failed_login_attempts, expected);
            assert_eq!(record.ban_minutes, 0);
        }

        // attempt 5: short ban, session gone
        let err = engine.login(id, "wrong", now).unwrap_err();
        assert!(matches!(
            err,
            AuthError::Banned { minutes: 5, remaining_minutes: Some(5), .. }
        ));
        assert_eq!(engine.session_state(id), None);

        let record = engine.store.get(id).unwrap();
        assert_eq!(record.ban_minutes, 5);
        assert_eq!(record.ban_started_at, Some(now));
        assert!(sanction::is_banned(&record, now));

        // the ban expires: exactly 5 minutes is out of the window
        let later = now + chrono::Duration::minutes(5) + chrono::Duration::seconds(1);
        assert!(!sanction::is_banned(&record, later));
    }

    #[test]
    fn sixth_and_seventh_attempts_escalate_further() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U2");
        engine.register(id, "pw", "pw").unwrap();
        engine.disconnect(id);

        let now = Utc::now();

        // walk to 5 failures, clear the short ban, fail again
        engine.connect(id, "U2", now, MonotonicInstant::now()).unwrap();
        for _ in 0..5 {
            let _ = engine.login(id, "wrong", now);
        }
        engine.clear_ban(id, now).unwrap();

        engine.connect(id, "U2", now, MonotonicInstant::now()).unwrap();
        let err = engine.login(id, "wrong", now).unwrap_err();
        assert!(matches!(err, AuthError::Banned { minutes: 1440, .. }));
        assert_eq!(engine.store.get(id).unwrap().failed_login_attempts, 6);

        engine.clear_ban(id, now).unwrap();
        engine.connect(id, "U2", now, MonotonicInstant::now()).unwrap();
        let err = engine.login(id, "wrong", now).unwrap_err();
        assert!(matches!(
            err,
            AuthError::Banned { minutes: -1, remaining_minutes: None, .. }
        ));
    }

    #[test]
    fn banned_identity_cannot_connect() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U2");
        let now = Utc::now();
        engine.apply_ban(id, 30, Some("griefing".into()), now).unwrap();

        let err = engine
            .connect(id, "U2", now, MonotonicInstant::now())
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Banned { remaining_minutes: Some(30), .. }
        ));
        assert_eq!(engine.session_state(id), None);
    }

    #[test]
    fn expired_ban_is_cleared_on_connect() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U2");
        let now = Utc::now();
        engine.apply_ban(id, 5, None, now).unwrap();

        let later = now + chrono::Duration::minutes(6);
        engine.connect(id, "U2", later, MonotonicInstant::now()).unwrap();

        let record = engine.store.get(id).unwrap();
        assert_eq!(record.ban_minutes, 0);
        assert!(record.ban_started_at.is_none());
    }

    #[test]
    fn deadline_kicks_only_the_unauthenticated() {
        let mut engine = engine();
        let now = Utc::now();
        let start = MonotonicInstant::now();

        // two registered identities reconnect; one logs in
        let (slow, _) = connect(&mut engine, "Slow");
        engine.register(slow, "pw", "pw").unwrap();
        engine.disconnect(slow);
        let (fast, _) = connect(&mut engine, "Fast");
        engine.register(fast, "pw", "pw").unwrap();
        engine.disconnect(fast);

        engine.connect(slow, "Slow", now, start).unwrap();
        engine.connect(fast, "Fast", now, start).unwrap();
        engine.login(fast, "pw", now).unwrap();

        let events = engine.tick(start + Duration::from_secs(301));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            EngineEvent::Kick { player_id, reason: KickReason::LoginTimeout, .. }
                if *player_id == slow
        ));
        assert_eq!(engine.session_state(slow), None);
        assert!(engine.is_authenticated(fast));

        // drained: nothing fires again
        assert!(engine.tick(start + Duration::from_secs(600)).is_empty());
    }

    #[test]
    fn unregistered_session_is_kicked_at_the_deadline() {
        let mut engine = engine();
        let now = Utc::now();
        let start = MonotonicInstant::now();

        // first-ever connect: no credential yet, same window applies
        let id = PlayerId::new();
        let state = engine.connect(id, "Idle", now, start).unwrap();
        assert_eq!(state, SessionState::AwaitingRegistration);
        assert!(engine.deadlines.is_pending(id));

        assert!(engine.tick(start + Duration::from_secs(299)).is_empty());
        let events = engine.tick(start + Duration::from_secs(301));
        assert!(matches!(
            &events[..],
            [EngineEvent::Kick { player_id, reason: KickReason::LoginTimeout, .. }]
                if *player_id == id
        ));
        assert_eq!(engine.session_state(id), None);
    }

    #[test]
    fn reconnect_rearms_a_single_deadline() {
        let mut engine = engine();
        let now = Utc::now();
        let start = MonotonicInstant::now();

        let (id, _) = connect(&mut engine, "U2");
        engine.register(id, "pw", "pw").unwrap();
        engine.disconnect(id);

        engine.connect(id, "U2", now, start).unwrap();
        engine.connect(id, "U2", now, start + Duration::from_secs(100)).unwrap();
        assert_eq!(engine.deadlines.len(), 1);

        // the first deadline was replaced, so nothing fires at its time
        assert!(engine.tick(start + Duration::from_secs(301)).is_empty());
        assert_eq!(engine.tick(start + Duration::from_secs(401)).len(), 1);
    }

    #[test]
    fn disconnect_twice_is_a_no_op() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "U1");

        assert!(engine.disconnect(id));
        assert!(!engine.disconnect(id));
    }

    #[test]
    fn moderation_ops_persist_and_report_counters() {
        let mut engine = engine();
        let now = Utc::now();
        let (id, _) = connect(&mut engine, "Target");

        let status = engine.add_warn(id, now).unwrap();
        assert_eq!(status.warn_count, 1);
        let status = engine.add_warn(id, now).unwrap();
        assert_eq!(status.warn_count, 2);
        let status = engine.remove_warn(id, now).unwrap();
        assert_eq!(status.warn_count, 1);

        let MuteOutcome::Applied(status) = engine.apply_mute(id, 10, now).unwrap() else {
            panic!("fresh mute was not applied");
        };
        assert_eq!(status.mute, SanctionState::Active { remaining_minutes: 10 });
        let status = engine.clear_mute(id, now).unwrap();
        assert_eq!(status.mute, SanctionState::None);

        let (status, event) = engine.apply_ban(id, -1, Some("bye".into()), now).unwrap();
        assert_eq!(status.ban, SanctionState::Permanent);
        assert!(matches!(
            event,
            Some(EngineEvent::Kick { reason: KickReason::Banned { minutes: -1, .. }, .. })
        ));

        let status = engine.clear_ban(id, now).unwrap();
        assert_eq!(status.ban, SanctionState::None);

        // persisted immediately, visible through a fresh read
        let record = engine.store.get(id).unwrap();
        assert_eq!(record.warn_count, 1);
        assert_eq!(record.ban_minutes, 0);
    }

    #[test]
    fn moderation_on_unknown_identity_returns_none() {
        let mut engine = engine();
        let now = Utc::now();
        let id = PlayerId::new();

        assert!(engine.apply_ban(id, 5, None, now).is_none());
        assert!(engine.clear_ban(id, now).is_none());
        assert!(engine.apply_mute(id, 5, now).is_none());
        assert!(engine.add_warn(id, now).is_none());
        assert!(engine.kick(id, None).is_none());
        assert!(engine.purge_record(id, now).is_none());
        assert!(engine.moderation_status(id, now).is_none());
    }

    #[test]
    fn second_mute_leaves_the_active_window_untouched() {
        let mut engine = engine();
        let now = Utc::now();
        let (id, _) = connect(&mut engine, "Noisy");

        assert!(matches!(
            engine.apply_mute(id, 10, now).unwrap(),
            MuteOutcome::Applied(_)
        ));

        let MuteOutcome::AlreadyMuted(status) = engine.apply_mute(id, 60, now).unwrap() else {
            panic!("active mute was replaced");
        };
        assert_eq!(status.mute, SanctionState::Active { remaining_minutes: 10 });
        assert_eq!(engine.store.get(id).unwrap().mute_minutes, 10);

        // once the window has elapsed a new mute takes effect
        let later = now + chrono::Duration::minutes(10);
        let MuteOutcome::Applied(status) = engine.apply_mute(id, 60, later).unwrap() else {
            panic!("expired mute blocked a new one");
        };
        assert_eq!(status.mute, SanctionState::Active { remaining_minutes: 60 });
    }

    #[test]
    fn purge_deletes_the_record_and_kicks_the_session() {
        let mut engine = engine();
        let now = Utc::now();
        let (id, _) = connect(&mut engine, "Gone");
        engine.register(id, "pw", "pw").unwrap();

        let events = engine.purge_record(id, now).unwrap();
        assert!(matches!(
            &events[..],
            [EngineEvent::Kick { reason: KickReason::Removed { .. }, .. }]
        ));
        assert_eq!(engine.session_state(id), None);
        assert!(engine.store.get(id).is_none());
        assert!(engine.purge_record(id, now).is_none());
    }

    #[test]
    fn kick_removes_the_session_without_a_sanction() {
        let mut engine = engine();
        let (id, _) = connect(&mut engine, "Loud");

        let event = engine.kick(id, Some("spamming".into())).unwrap();
        assert!(matches!(
            event,
            EngineEvent::Kick { reason: KickReason::Removed { .. }, .. }
        ));
        assert_eq!(engine.session_state(id), None);
        assert_eq!(engine.store.get(id).unwrap().ban_minutes, 0);
    }

    struct BrokenHasher;

    impl CredentialHasher for BrokenHasher {
        fn hash(&self, _password: &str) -> Result<String, HashingUnavailable> {
            Err(HashingUnavailable("digest backend missing".into()))
        }
    }

    #[test]
    fn hashing_failure_surfaces_instead_of_matching() {
        let store = Arc::new(RecordStore::new(Arc::new(
            SqliteBackend::in_memory().unwrap(),
        )));
        let mut engine = SessionEngine::new(Policy::default(), store, Arc::new(BrokenHasher));

        let (id, _) = connect(&mut engine, "U1");
        assert!(matches!(
            engine.register(id, "pw", "pw"),
            Err(AuthError::HashingUnavailable(_))
        ));
        // nothing was stored and no attempt was burned
        let record = engine.store.get(id).unwrap();
        assert!(record.credential_hash.is_none());
        assert_eq!(record.failed_login_attempts, 0);
    }
}
