//! Storage module for persisting the card dataset
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Card records and their index entries, committed together
//! - Frontier persistence between sessions
//! - Run tracking and integrity checks
//! - The lock file that keeps a dataset to one active session

mod lock;
mod schema;
mod sqlite;
mod traits;

pub use lock::SessionLock;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SessionState;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: SessionState,
    pub items_committed: u32,
}

impl RunRecord {
    /// Returns true if the run never recorded a terminal state
    ///
    /// This happens when the process died mid-session.
    pub fn was_interrupted(&self) -> bool {
        self.finished_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_storage_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.db");
        let storage = open_storage(&path);
        assert!(storage.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_run_interrupted() {
        let run = RunRecord {
            id: 1,
            started_at: "2024-01-01T00:00:00Z".to_string(),
            finished_at: None,
            config_hash: "abc".to_string(),
            status: SessionState::Running,
            items_committed: 0,
        };
        assert!(run.was_interrupted());
    }
}
