//! JSON-directory backend: one file per player
//!
//! Layout under the data directory:
//! - `players/<uuid>.json` — one record per identity
//! - `audit.jsonl` — append-only audit log, one JSON object per line

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};
use warden_util::PlayerId;

use crate::{AuditEvent, PlayerRecord, RecordBackend, StoreError, StoreResult};

/// JSON-directory backend
pub struct JsonDirBackend {
    players_dir: PathBuf,
    audit_path: PathBuf,
    // Serializes audit appends; record files are keyed per player and
    // only ever written from the control thread.
    audit_lock: Mutex<()>,
}

impl JsonDirBackend {
    /// Open or create a backend rooted at the given data directory
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        let players_dir = data_dir.join("players");
        fs::create_dir_all(&players_dir)?;

        Ok(Self {
            players_dir,
            audit_path: data_dir.join("audit.jsonl"),
            audit_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, player_id: PlayerId) -> PathBuf {
        self.players_dir.join(format!("{player_id}.json"))
    }
}

impl RecordBackend for JsonDirBackend {
    fn load_all(&self) -> StoreResult<Vec<(PlayerId, PlayerRecord)>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.players_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(player_id) = stem.parse::<PlayerId>() else {
                warn!(file = %path.display(), "Skipping record file with non-UUID name");
                continue;
            };

            let record = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<PlayerRecord>(&content).map_err(|e| e.to_string())
                });

            match record {
                Ok(record) => records.push((player_id, record)),
                Err(message) => {
                    warn!(%player_id, %message, "Skipping unreadable record");
                }
            }
        }

        Ok(records)
    }

    fn save(&self, player_id: PlayerId, record: &PlayerRecord) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.record_path(player_id), json).map_err(|e| StoreError::Write {
            player_id,
            message: e.to_string(),
        })?;

        debug!(%player_id, "Record saved");
        Ok(())
    }

    fn delete(&self, player_id: PlayerId) -> StoreResult<()> {
        let path = self.record_path(player_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
        let line = serde_json::to_string(&event)?;

        let _guard = self.audit_lock.lock().unwrap();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_path)?;
        writeln!(file, "{line}")?;

        Ok(())
    }

    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let _guard = self.audit_lock.lock().unwrap();
        if !self.audit_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.audit_path)?;
        let mut events = Vec::new();
        for (index, line) in content.lines().enumerate() {
            match serde_json::from_str::<AuditEvent>(line) {
                Ok(mut event) => {
                    event.id = index as i64 + 1;
                    events.push(event);
                }
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping malformed audit line");
                }
            }
        }

        events.reverse();
        events.truncate(limit);
        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        self.players_dir.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        let id = PlayerId::new();
        let mut record = PlayerRecord::new("Steve");
        record.credential_hash = Some("abc123".into());
        record.warn_count = 2;
        backend.save(id, &record).unwrap();

        let loaded = backend.load_all().unwrap();
        assert_eq!(loaded, vec![(id, record)]);
    }

    #[test]
    fn corrupt_record_skipped_rest_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        let good_id = PlayerId::new();
        backend.save(good_id, &PlayerRecord::new("Good")).unwrap();

        let bad_id = PlayerId::new();
        fs::write(
            dir.path().join("players").join(format!("{bad_id}.json")),
            "{not valid json",
        )
        .unwrap();

        let loaded = backend.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, good_id);
    }

    #[test]
    fn non_uuid_filename_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        fs::write(dir.path().join("players").join("README.json"), "{}").unwrap();

        assert!(backend.load_all().unwrap().is_empty());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        let id = PlayerId::new();
        backend.save(id, &PlayerRecord::new("Gone")).unwrap();
        backend.delete(id).unwrap();
        backend.delete(id).unwrap();

        assert!(backend.load_all().unwrap().is_empty());
    }

    #[test]
    fn audit_log_returns_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        let id = PlayerId::new();
        backend
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();
        backend
            .append_audit(AuditEvent::new(AuditEventType::WarnAdded {
                player_id: id,
                warn_count: 1,
            }))
            .unwrap();

        let events = backend.recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::WarnAdded { .. }));
        assert!(matches!(events[1].event, AuditEventType::ServiceStarted));

        // Limit applies after ordering
        let events = backend.recent_audits(1).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, AuditEventType::WarnAdded { .. }));
    }
}
