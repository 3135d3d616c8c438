//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::card::{is_valid_fingerprint, CardRecord, CardType, Rarity};
use crate::state::{FrontierCursor, FrontierItem, IndexEntry, SessionState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database, including when the
    ///   file exists but is not a SQLite database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // WAL + NORMAL keeps committed transactions across a process crash
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Gives raw access to the connection (for corruption tests)
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: SessionState::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(SessionState::Running),
        items_committed: row.get(5)?,
    })
}

fn parse_timestamp(card_id: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::Corrupt(format!(
                "index entry {} has unreadable timestamp '{}': {}",
                card_id, raw, e
            ))
        })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, SessionState::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, items_committed
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, items_committed
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: SessionState,
        items_committed: u32,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, items_committed = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, items_committed, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Integrity =====

    fn check_integrity(&self) -> StorageResult<Vec<String>> {
        let mut problems = Vec::new();

        let mut stmt = self.conn.prepare("PRAGMA integrity_check")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            let message = row?;
            if message != "ok" {
                problems.push(message);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT c.id FROM cards c
             LEFT JOIN index_entries i ON i.card_id = c.id
             WHERE i.card_id IS NULL",
        )?;
        let orphans = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for id in orphans {
            problems.push(format!("card {} has no index entry", id));
        }

        let mut stmt = self.conn.prepare(
            "SELECT i.card_id FROM index_entries i
             LEFT JOIN cards c ON c.id = i.card_id
             WHERE c.id IS NULL",
        )?;
        let dangling = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for id in dangling {
            problems.push(format!("index entry {} has no card record", id));
        }

        Ok(problems)
    }

    // ===== Index =====

    fn load_index(&self) -> StorageResult<HashMap<String, IndexEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT card_id, fingerprint, last_fetched_at, origin_page FROM index_entries",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<u32>>(3)?,
            ))
        })?;

        let mut entries = HashMap::new();
        for row in rows {
            let (card_id, fingerprint, fetched_raw, origin_page) = row?;

            if !is_valid_fingerprint(&fingerprint) {
                return Err(StorageError::Corrupt(format!(
                    "index entry {} has malformed fingerprint '{}'",
                    card_id, fingerprint
                )));
            }
            let last_fetched_at = parse_timestamp(&card_id, &fetched_raw)?;

            entries.insert(
                card_id,
                IndexEntry {
                    fingerprint,
                    last_fetched_at,
                    origin_page,
                },
            );
        }

        Ok(entries)
    }

    fn touch_index_entry(
        &mut self,
        card_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE index_entries SET last_fetched_at = ?1 WHERE card_id = ?2",
            params![fetched_at.to_rfc3339(), card_id],
        )?;
        if updated == 0 {
            return Err(StorageError::CardNotFound(card_id.to_string()));
        }
        Ok(())
    }

    // ===== Cards =====

    fn commit_card(&mut self, record: &CardRecord, entry: &IndexEntry) -> StorageResult<()> {
        let record_json = serde_json::to_string(record)?;
        let fetched_at = entry.last_fetched_at.to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO cards (id, name, rarity, card_type, group_key, record_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                rarity = excluded.rarity,
                card_type = excluded.card_type,
                group_key = excluded.group_key,
                record_json = excluded.record_json,
                updated_at = excluded.updated_at",
            params![
                record.id,
                record.name,
                record.rarity.to_db_string(),
                record.card_type.to_db_string(),
                record.group_key,
                record_json,
                fetched_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO index_entries (card_id, fingerprint, last_fetched_at, origin_page)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(card_id) DO UPDATE SET
                fingerprint = excluded.fingerprint,
                last_fetched_at = excluded.last_fetched_at,
                origin_page = COALESCE(excluded.origin_page, index_entries.origin_page)",
            params![record.id, entry.fingerprint, fetched_at, entry.origin_page],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn get_card(&self, card_id: &str) -> StorageResult<Option<CardRecord>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM cards WHERE id = ?1",
                params![card_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn load_cards(&self) -> StorageResult<Vec<CardRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_json FROM cards ORDER BY length(id), id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(serde_json::from_str(&row?)?);
        }

        Ok(cards)
    }

    // ===== Frontier Management =====

    fn save_frontier(&mut self, cursor: &FrontierCursor) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM frontier_items", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO frontier_items (position, kind, page_number, card_id, url, origin_page)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, item) in cursor.items.iter().enumerate() {
                match item {
                    FrontierItem::ListPage { page } => {
                        stmt.execute(params![
                            position as i64,
                            item.kind(),
                            page,
                            None::<String>,
                            None::<String>,
                            None::<u32>
                        ])?;
                    }
                    FrontierItem::DetailPage {
                        id,
                        url,
                        origin_page,
                    } => {
                        stmt.execute(params![
                            position as i64,
                            item.kind(),
                            None::<u32>,
                            id,
                            url,
                            origin_page
                        ])?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_frontier(&self) -> StorageResult<Option<FrontierCursor>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, page_number, card_id, url, origin_page
             FROM frontier_items ORDER BY position",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<u32>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<u32>>(4)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let item = match row? {
                (kind, Some(page), _, _, _) if kind == "list_page" => FrontierItem::ListPage { page },
                (kind, _, Some(id), Some(url), origin_page) if kind == "detail_page" => {
                    FrontierItem::DetailPage {
                        id,
                        url,
                        origin_page,
                    }
                }
                (kind, ..) => {
                    return Err(StorageError::Corrupt(format!(
                        "malformed frontier item of kind '{}'",
                        kind
                    )))
                }
            };
            items.push(item);
        }

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(FrontierCursor::new(items)))
        }
    }

    fn clear_frontier(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM frontier_items", [])?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_cards(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_cards_by_rarity(&self) -> StorageResult<HashMap<Rarity, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rarity, COUNT(*) FROM cards GROUP BY rarity")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (raw, count) = row?;
            let rarity = Rarity::from_db_string(&raw)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown rarity '{}'", raw)))?;
            counts.insert(rarity, count as u64);
        }

        Ok(counts)
    }

    fn count_cards_by_type(&self) -> StorageResult<HashMap<CardType, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT card_type, COUNT(*) FROM cards GROUP BY card_type")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (raw, count) = row?;
            let card_type = CardType::from_db_string(&raw)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown card type '{}'", raw)))?;
            counts.insert(card_type, count as u64);
        }

        Ok(counts)
    }

    fn count_groups(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT group_key) FROM cards",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
