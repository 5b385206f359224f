//! SQLite backend

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};
use warden_util::PlayerId;

use crate::{AuditEvent, PlayerRecord, RecordBackend, StoreError, StoreResult};

/// SQLite backend: records and audit log in one database file
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- One record per identity; the payload is the serde form of
            -- PlayerRecord so both backends share one layout
            CREATE TABLE IF NOT EXISTS records (
                player_id TEXT PRIMARY KEY,
                record_json TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl RecordBackend for SqliteBackend {
    fn load_all(&self) -> StoreResult<Vec<(PlayerId, PlayerRecord)>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT player_id, record_json FROM records")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let json: String = row.get(1)?;
            Ok((id, json))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id_str, json) = row?;
            let Ok(player_id) = id_str.parse::<PlayerId>() else {
                warn!(player_id = %id_str, "Skipping record row with non-UUID key");
                continue;
            };
            match serde_json::from_str::<PlayerRecord>(&json) {
                Ok(record) => records.push((player_id, record)),
                Err(e) => {
                    warn!(%player_id, error = %e, "Skipping unreadable record");
                }
            }
        }

        Ok(records)
    }

    fn save(&self, player_id: PlayerId, record: &PlayerRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let json = serde_json::to_string(record)?;

        conn.execute(
            r#"
            INSERT INTO records (player_id, record_json)
            VALUES (?, ?)
            ON CONFLICT(player_id)
            DO UPDATE SET record_json = excluded.record_json
            "#,
            params![player_id.to_string(), json],
        )
        .map_err(|e| StoreError::Write {
            player_id,
            message: e.to_string(),
        })?;

        debug!(%player_id, "Record saved");
        Ok(())
    }

    fn delete(&self, player_id: PlayerId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM records WHERE player_id = ?",
            [player_id.to_string()],
        )?;
        Ok(())
    }

    fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        debug!(event_id = conn.last_insert_rowid(), "Audit event appended");
        Ok(())
    }

    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?")?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
