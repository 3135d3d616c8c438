/// In-memory view of the persistent card index
///
/// The index maps card identifiers to their last-known state. It is loaded
/// once from storage at session start; afterwards the writer updates it right
/// after each durable commit, so reads always reflect what is on disk.
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Last-known state of one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// SHA-256 fingerprint of the extracted record
    pub fingerprint: String,

    /// When the detail page was last fetched successfully
    pub last_fetched_at: DateTime<Utc>,

    /// List page the card was discovered on; `None` for related-card discoveries
    pub origin_page: Option<u32>,
}

impl IndexEntry {
    pub fn new(fingerprint: impl Into<String>, origin_page: Option<u32>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            last_fetched_at: Utc::now(),
            origin_page,
        }
    }
}

/// Identifier → last-known state
#[derive(Debug, Clone, Default)]
pub struct CardIndex {
    entries: HashMap<String, IndexEntry>,
}

impl CardIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index from entries loaded from storage
    pub fn from_entries(entries: HashMap<String, IndexEntry>) -> Self {
        Self { entries }
    }

    /// Returns true if the identifier has an entry
    ///
    /// Absence of an entry is the only signal that a card is new.
    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns the stored fingerprint for an identifier
    pub fn fingerprint_of(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|e| e.fingerprint.as_str())
    }

    /// Returns the full entry for an identifier
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// Records a committed fingerprint
    ///
    /// Called after the matching storage transaction has committed. An
    /// existing origin page is kept when the new commit has none.
    ///
    /// # Arguments
    ///
    /// * `id` - The card identifier
    /// * `fingerprint` - Fingerprint of the committed record
    /// * `timestamp` - Fetch time of the committed record
    /// * `origin_page` - List page the card was found on, if any
    pub fn commit(
        &mut self,
        id: &str,
        fingerprint: &str,
        timestamp: DateTime<Utc>,
        origin_page: Option<u32>,
    ) -> &IndexEntry {
        let origin_page = origin_page.or_else(|| self.entries.get(id).and_then(|e| e.origin_page));
        self.entries.insert(
            id.to_string(),
            IndexEntry {
                fingerprint: fingerprint.to_string(),
                last_fetched_at: timestamp,
                origin_page,
            },
        );
        &self.entries[id]
    }

    /// Refreshes the fetch timestamp of an existing entry
    ///
    /// Returns false if the identifier is unknown.
    pub fn touch(&mut self, id: &str, timestamp: DateTime<Utc>) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.last_fetched_at = timestamp;
                true
            }
            None => false,
        }
    }

    /// Returns the number of indexed cards
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no card has been indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all indexed identifiers
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}
