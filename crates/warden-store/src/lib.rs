//! Persistence layer for wardend
//!
//! Provides:
//! - The `PlayerRecord` data model (one durable record per identity)
//! - The concurrent in-memory `RecordStore`
//! - The `RecordBackend` contract with JSON-directory and SQLite
//!   implementations
//! - An append-only moderation audit log

mod audit;
mod backend;
mod json;
mod record;
mod sqlite;
mod store;

pub use audit::*;
pub use backend::*;
pub use json::*;
pub use record::*;
pub use sqlite::*;
pub use store::*;

use thiserror::Error;
use warden_util::PlayerId;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read record for {player_id}: {message}")]
    Read { player_id: PlayerId, message: String },

    #[error("Failed to write record for {player_id}: {message}")]
    Write { player_id: PlayerId, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
