//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::card::{CardRecord, CardType, Rarity};
use crate::state::{FrontierCursor, IndexEntry, SessionState};
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt data: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawl session
/// and the read-only dataset helpers.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the terminal state of a run with a finish timestamp
    fn finish_run(
        &mut self,
        run_id: i64,
        status: SessionState,
        items_committed: u32,
    ) -> StorageResult<()>;

    // ===== Integrity =====

    /// Runs the consistency checks performed before a session loads its index
    ///
    /// # Returns
    ///
    /// A list of problems found; empty if the store is healthy
    fn check_integrity(&self) -> StorageResult<Vec<String>>;

    // ===== Index =====

    /// Loads every index entry
    ///
    /// Entries with a malformed fingerprint or timestamp are reported as
    /// `StorageError::Corrupt`.
    fn load_index(&self) -> StorageResult<HashMap<String, IndexEntry>>;

    /// Refreshes `last_fetched_at` of an existing entry
    fn touch_index_entry(&mut self, card_id: &str, fetched_at: DateTime<Utc>)
        -> StorageResult<()>;

    // ===== Cards =====

    /// Upserts a card and its index entry in a single transaction
    ///
    /// # Arguments
    ///
    /// * `record` - The card record to persist
    /// * `entry` - The index entry describing that record
    fn commit_card(&mut self, record: &CardRecord, entry: &IndexEntry) -> StorageResult<()>;

    /// Gets a card by identifier
    fn get_card(&self, card_id: &str) -> StorageResult<Option<CardRecord>>;

    /// Loads every persisted card, ordered by identifier
    fn load_cards(&self) -> StorageResult<Vec<CardRecord>>;

    // ===== Frontier Management =====

    /// Replaces the persisted frontier with `cursor`
    fn save_frontier(&mut self, cursor: &FrontierCursor) -> StorageResult<()>;

    /// Loads the persisted frontier, if any work was left behind
    fn load_frontier(&self) -> StorageResult<Option<FrontierCursor>>;

    /// Clears the persisted frontier
    fn clear_frontier(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    /// Gets total card count
    fn count_cards(&self) -> StorageResult<u64>;

    /// Gets card counts per rarity
    fn count_cards_by_rarity(&self) -> StorageResult<HashMap<Rarity, u64>>;

    /// Gets card counts per type
    fn count_cards_by_type(&self) -> StorageResult<HashMap<CardType, u64>>;

    /// Gets the number of distinct version groups
    fn count_groups(&self) -> StorageResult<u64>;
}
