//! Writer: the single owner of the dataset connection
//!
//! A commit persists the card row and its index entry in one transaction and
//! only then updates the in-memory index, so the index never runs ahead of
//! what is on disk.

use crate::card::{fingerprint, CardRecord};
use crate::crawler::assets::AssetStore;
use crate::state::{CardIndex, IndexEntry};
use crate::storage::{Storage, StorageResult};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// What a commit did to the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// First time this identifier was stored
    Inserted,
    /// Stored before with a different fingerprint
    Updated,
    /// Same fingerprint; only the fetch timestamp was refreshed
    Unchanged,
}

impl CommitOutcome {
    /// Returns true if the commit counts against the new-item budget
    pub fn is_new_item(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted => write!(f, "inserted"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

pub struct Writer<S> {
    storage: S,
    index: CardIndex,
    assets: Option<Arc<dyn AssetStore>>,
}

impl<S: Storage> Writer<S> {
    pub fn new(storage: S, index: CardIndex) -> Self {
        Self {
            storage,
            index,
            assets: None,
        }
    }

    /// Hands the assets of every changed record to `store`
    pub fn with_asset_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(store);
        self
    }

    pub fn index(&self) -> &CardIndex {
        &self.index
    }

    pub(crate) fn replace_index(&mut self, index: CardIndex) {
        self.index = index;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Commits a freshly extracted record
    ///
    /// # Arguments
    ///
    /// * `record` - The extracted record
    /// * `origin_page` - List page the card was discovered on, if any
    ///
    /// # Returns
    ///
    /// * `Ok(CommitOutcome)` - What changed
    /// * `Err(StorageError)` - The transaction failed; neither the dataset nor the index changed
    pub async fn commit(
        &mut self,
        record: &CardRecord,
        origin_page: Option<u32>,
    ) -> StorageResult<CommitOutcome> {
        let fingerprint = fingerprint(record)?;
        let now = Utc::now();
        let previous = self.index.fingerprint_of(&record.id).map(str::to_string);

        if previous.as_deref() == Some(fingerprint.as_str()) {
            self.storage.touch_index_entry(&record.id, now)?;
            self.index.touch(&record.id, now);
            return Ok(CommitOutcome::Unchanged);
        }

        let entry = IndexEntry {
            fingerprint: fingerprint.clone(),
            last_fetched_at: now,
            origin_page,
        };
        self.storage.commit_card(record, &entry)?;
        self.index.commit(&record.id, &fingerprint, now, origin_page);

        self.store_assets(record).await;

        Ok(if previous.is_some() {
            CommitOutcome::Updated
        } else {
            CommitOutcome::Inserted
        })
    }

    async fn store_assets(&self, record: &CardRecord) {
        let Some(store) = &self.assets else {
            return;
        };

        for (role, url) in record.assets.entries() {
            if let Err(e) = store.store_asset(&record.id, role, url).await {
                tracing::warn!("Asset {} of card {} not stored: {}", role, record.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::test_support::sample_record;
    use crate::card::AssetRole;
    use crate::crawler::assets::AssetError;
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<(String, AssetRole, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl AssetStore for RecordingStore {
        async fn store_asset(
            &self,
            card_id: &str,
            role: AssetRole,
            url: &str,
        ) -> Result<(), AssetError> {
            self.calls
                .lock()
                .unwrap()
                .push((card_id.to_string(), role, url.to_string()));
            if self.fail {
                return Err(AssetError::Download {
                    url: url.to_string(),
                    reason: "HTTP 500".to_string(),
                });
            }
            Ok(())
        }
    }

    fn writer() -> Writer<SqliteStorage> {
        Writer::new(SqliteStorage::new_in_memory().unwrap(), CardIndex::new())
    }

    #[tokio::test]
    async fn test_insert_then_unchanged() {
        let mut writer = writer();
        let record = sample_record("1001", "Goku");

        assert_eq!(
            writer.commit(&record, Some(1)).await.unwrap(),
            CommitOutcome::Inserted
        );
        let first_fetch = writer.index().get("1001").unwrap().last_fetched_at;

        assert_eq!(
            writer.commit(&record, Some(1)).await.unwrap(),
            CommitOutcome::Unchanged
        );
        assert!(writer.index().get("1001").unwrap().last_fetched_at >= first_fetch);
        assert_eq!(writer.storage().count_cards().unwrap(), 1);
    }

    #[test]
    fn test_only_changes_count_as_new_items() {
        assert!(CommitOutcome::Inserted.is_new_item());
        assert!(CommitOutcome::Updated.is_new_item());
        assert!(!CommitOutcome::Unchanged.is_new_item());
    }

    #[tokio::test]
    async fn test_changed_content_updates() {
        let mut writer = writer();
        let mut record = sample_record("1001", "Goku");
        writer.commit(&record, Some(2)).await.unwrap();
        let before = writer.index().fingerprint_of("1001").unwrap().to_string();

        record.leader_skill = Some("Ki +3".to_string());
        assert_eq!(
            writer.commit(&record, None).await.unwrap(),
            CommitOutcome::Updated
        );

        assert_ne!(writer.index().fingerprint_of("1001").unwrap(), before);
        // Origin page survives a commit without one
        assert_eq!(writer.index().get("1001").unwrap().origin_page, Some(2));
        let stored = writer.storage().get_card("1001").unwrap().unwrap();
        assert_eq!(stored.leader_skill.as_deref(), Some("Ki +3"));
    }

    #[tokio::test]
    async fn test_index_matches_storage() {
        let mut writer = writer();
        for id in ["1", "2", "3"] {
            writer.commit(&sample_record(id, "Vegeta"), Some(1)).await.unwrap();
        }

        let persisted = writer.storage().load_index().unwrap();
        assert_eq!(persisted.len(), writer.index().len());
        for (id, entry) in persisted {
            assert_eq!(writer.index().fingerprint_of(&id), Some(entry.fingerprint.as_str()));
        }
    }

    #[tokio::test]
    async fn test_assets_handed_off() {
        let store = Arc::new(RecordingStore::default());
        let mut writer = writer().with_asset_store(store.clone());

        let mut record = sample_record("7", "Gohan");
        record.assets.fill(AssetRole::Character, "https://x/card_7_character.png");
        record.assets.fill(AssetRole::Background, "https://x/card_7_bg.png");
        writer.commit(&record, None).await.unwrap();

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(id, _, _)| id == "7"));
    }

    #[tokio::test]
    async fn test_asset_failure_keeps_commit() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..RecordingStore::default()
        });
        let mut writer = writer().with_asset_store(store);

        let mut record = sample_record("8", "Piccolo");
        record.assets.fill(AssetRole::Character, "https://x/card_8_character.png");

        assert_eq!(
            writer.commit(&record, None).await.unwrap(),
            CommitOutcome::Inserted
        );
        assert!(writer.storage().get_card("8").unwrap().is_some());
    }
}
