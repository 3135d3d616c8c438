//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Dokkan-Archive database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl sessions
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    items_committed INTEGER NOT NULL DEFAULT 0
);

-- Persisted card records
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    rarity TEXT NOT NULL,
    card_type TEXT NOT NULL,
    group_key TEXT NOT NULL,
    record_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_group ON cards(group_key);
CREATE INDEX IF NOT EXISTS idx_cards_rarity ON cards(rarity);
CREATE INDEX IF NOT EXISTS idx_cards_type ON cards(card_type);

-- One entry per persisted card
CREATE TABLE IF NOT EXISTS index_entries (
    card_id TEXT PRIMARY KEY REFERENCES cards(id),
    fingerprint TEXT NOT NULL,
    last_fetched_at TEXT NOT NULL,
    origin_page INTEGER
);

-- Pending work saved between sessions, in pop order
CREATE TABLE IF NOT EXISTS frontier_items (
    position INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    page_number INTEGER,
    card_id TEXT,
    url TEXT,
    origin_page INTEGER
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", get_schema_version())?;
    Ok(())
}

/// Gets the current schema version
pub fn get_schema_version() -> u32 {
    1
}
