//! Durable storage contract

use warden_util::PlayerId;

use crate::{AuditEvent, PlayerRecord, StoreResult};

/// Durable storage for player records and the audit log.
///
/// Backends are interchangeable; the record layout they persist is the
/// serde form of [`PlayerRecord`], keyed by the player's UUID.
pub trait RecordBackend: Send + Sync {
    /// Load every readable record.
    ///
    /// Individual unreadable or corrupt entries are skipped with a
    /// logged warning; only a failure to enumerate the collection at
    /// all is an error.
    fn load_all(&self) -> StoreResult<Vec<(PlayerId, PlayerRecord)>>;

    /// Write one record.
    fn save(&self, player_id: PlayerId, record: &PlayerRecord) -> StoreResult<()>;

    /// Remove one record. No-op if absent.
    fn delete(&self, player_id: PlayerId) -> StoreResult<()>;

    /// Append an audit event.
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, most recent first.
    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Check if the backend is usable.
    fn is_healthy(&self) -> bool;
}
