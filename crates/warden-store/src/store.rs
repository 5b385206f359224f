//! The concurrent in-memory record store
//!
//! `RecordStore` is the sole owner of the identity → record mapping.
//! All mutation goes through the control thread via the session engine;
//! the one operation permitted off-thread is a point read of a single
//! identity's current snapshot (`get` / the helpers built on it), which
//! is what the chat-filter path uses. The internal `RwLock` makes that
//! discipline explicit instead of relying on a concurrent container's
//! implicit safety.
//!
//! Saves are best-effort: an I/O failure is logged and the in-memory
//! state stays authoritative until the next successful save, so a
//! transient write failure never loses a just-earned authentication.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use warden_util::PlayerId;

use crate::{AuditEvent, PlayerRecord, RecordBackend};

/// Owns the mapping from identity to `PlayerRecord`
pub struct RecordStore {
    records: RwLock<HashMap<PlayerId, PlayerRecord>>,
    backend: Arc<dyn RecordBackend>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            backend,
        }
    }

    /// Point read: clone of the identity's current record, if any.
    ///
    /// Safe to call from outside the control thread.
    pub fn get(&self, player_id: PlayerId) -> Option<PlayerRecord> {
        self.records.read().unwrap().get(&player_id).cloned()
    }

    /// Drop a record from memory and durable storage. Returns whether a
    /// record existed. A backend failure is logged; the in-memory
    /// removal stands so the identity reads as unknown either way.
    pub fn remove(&self, player_id: PlayerId) -> bool {
        let existed = self.records.write().unwrap().remove(&player_id).is_some();
        if existed && let Err(e) = self.backend.delete(player_id) {
            warn!(%player_id, error = %e, "Failed to delete stored record");
        }
        existed
    }

    /// Insert or replace a record, then persist it best-effort.
    pub fn upsert(&self, player_id: PlayerId, record: PlayerRecord) {
        self.records
            .write()
            .unwrap()
            .insert(player_id, record.clone());
        self.persist(player_id, &record);
    }

    /// Atomic read-modify-write of a single record under the write lock.
    ///
    /// Returns the updated snapshot, or `None` if the identity has no
    /// record. Does not persist; callers decide when to `save_one` so
    /// ordering guarantees (e.g. "attempt count persisted before the
    /// ban is applied") stay with the caller.
    pub fn update<F>(&self, player_id: PlayerId, f: F) -> Option<PlayerRecord>
    where
        F: FnOnce(&mut PlayerRecord),
    {
        let mut records = self.records.write().unwrap();
        let record = records.get_mut(&player_id)?;
        f(record);
        Some(record.clone())
    }

    /// Populate the store from durable storage. Called once at startup.
    ///
    /// Returns the number of records loaded. Unreadable entries were
    /// already skipped (and logged) by the backend; a failure to
    /// enumerate at all leaves the store empty rather than aborting.
    pub fn load_all(&self) -> usize {
        let loaded = match self.backend.load_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to load records, starting empty");
                return 0;
            }
        };

        let count = loaded.len();
        let mut records = self.records.write().unwrap();
        for (player_id, record) in loaded {
            records.insert(player_id, record);
        }

        info!(count, "Player records loaded");
        count
    }

    /// Persist every record. Called at shutdown; best-effort per record.
    pub fn save_all(&self) {
        let snapshot: Vec<(PlayerId, PlayerRecord)> = {
            let records = self.records.read().unwrap();
            records.iter().map(|(id, r)| (*id, r.clone())).collect()
        };

        let mut failures = 0usize;
        let count = snapshot.len();
        for (player_id, record) in snapshot {
            if let Err(e) = self.backend.save(player_id, &record) {
                warn!(%player_id, error = %e, "Failed to save record");
                failures += 1;
            }
        }

        if failures > 0 {
            warn!(failures, count, "Some records failed to save");
        } else {
            info!(count, "Player records saved");
        }
    }

    /// Persist a single record best-effort. Returns whether the write
    /// succeeded; in-memory state is authoritative either way.
    pub fn save_one(&self, player_id: PlayerId) -> bool {
        let Some(record) = self.get(player_id) else {
            return false;
        };
        self.persist(player_id, &record)
    }

    /// Append an audit event best-effort.
    pub fn audit(&self, event: AuditEvent) {
        if let Err(e) = self.backend.append_audit(event) {
            warn!(error = %e, "Failed to append audit event");
        }
    }

    /// Recent audit events, most recent first.
    pub fn recent_audits(&self, limit: usize) -> Vec<AuditEvent> {
        self.backend.recent_audits(limit).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read audit log");
            Vec::new()
        })
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    fn persist(&self, player_id: PlayerId, record: &PlayerRecord) -> bool {
        match self.backend.save(player_id, record) {
            Ok(()) => true,
            Err(e) => {
                warn!(%player_id, error = %e, "Failed to save record, memory remains authoritative");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteBackend;

    fn store() -> RecordStore {
        RecordStore::new(Arc::new(SqliteBackend::in_memory().unwrap()))
    }

    #[test]
    fn get_returns_none_for_unknown() {
        let store = store();
        assert!(store.get(PlayerId::new()).is_none());
    }

    #[test]
    fn upsert_then_get_returns_snapshot() {
        let store = store();
        let id = PlayerId::new();

        store.upsert(id, PlayerRecord::new("Steve"));

        let record = store.get(id).unwrap();
        assert_eq!(record.display_name, "Steve");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_is_atomic_and_returns_updated_clone() {
        let store = store();
        let id = PlayerId::new();
        store.upsert(id, PlayerRecord::new("Steve"));

        let updated = store
            .update(id, |r| r.failed_login_attempts += 1)
            .unwrap();

        assert_eq!(updated.failed_login_attempts, 1);
        assert_eq!(store.get(id).unwrap().failed_login_attempts, 1);
    }

    #[test]
    fn update_unknown_identity_returns_none() {
        let store = store();
        assert!(store.update(PlayerId::new(), |r| r.warn_count += 1).is_none());
    }

    #[test]
    fn update_does_not_persist_until_save_one() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let store = RecordStore::new(backend.clone());
        let id = PlayerId::new();
        store.upsert(id, PlayerRecord::new("Steve"));

        store.update(id, |r| r.warn_count = 7);
        let on_disk = backend.load_all().unwrap();
        assert_eq!(on_disk[0].1.warn_count, 0);

        assert!(store.save_one(id));
        let on_disk = backend.load_all().unwrap();
        assert_eq!(on_disk[0].1.warn_count, 7);
    }

    #[test]
    fn remove_drops_memory_and_disk() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let store = RecordStore::new(backend.clone());
        let id = PlayerId::new();
        store.upsert(id, PlayerRecord::new("Steve"));

        assert!(store.remove(id));
        assert!(store.get(id).is_none());
        assert!(backend.load_all().unwrap().is_empty());
        assert!(!store.remove(id));
    }

    #[test]
    fn load_all_restores_saved_records() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());

        let id = PlayerId::new();
        {
            let store = RecordStore::new(backend.clone());
            store.upsert(id, PlayerRecord::new("Durable"));
            store.save_all();
        }

        let store = RecordStore::new(backend);
        assert_eq!(store.load_all(), 1);
        assert_eq!(store.get(id).unwrap().display_name, "Durable");
    }

    #[test]
    fn save_one_unknown_identity_is_false() {
        let store = store();
        assert!(!store.save_one(PlayerId::new()));
    }

    #[test]
    fn point_reads_work_across_threads() {
        let store = Arc::new(store());
        let id = PlayerId::new();
        store.upsert(id, PlayerRecord::new("Concurrent"));

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let _ = store.get(id);
                }
            })
        };

        for i in 0..1000u32 {
            store.update(id, |r| r.warn_count = i);
        }

        reader.join().unwrap();
        assert!(store.get(id).is_some());
    }
}
