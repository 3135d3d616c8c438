//! Read-only view of the dataset for presentation
//!
//! `Catalog` loads every record once, computes version groups, and answers
//! list and detail queries without touching storage again.

use crate::card::{CardRecord, CardType, Rarity};
use crate::linker::{compare_ids, group_key, link_groups, VersionGroup};
use crate::storage::Storage;
use crate::DokkanError;
use std::collections::HashMap;

/// Criteria for `Catalog::list`; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    /// Case-insensitive substring of the card name
    pub search: Option<String>,
    pub rarity: Option<Rarity>,
    pub card_type: Option<CardType>,
}

impl CardFilter {
    pub fn matches(&self, record: &CardRecord) -> bool {
        if let Some(rarity) = self.rarity {
            if record.rarity != rarity {
                return false;
            }
        }
        if let Some(card_type) = self.card_type {
            if record.card_type != card_type {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => record
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// A card together with the versions it is linked to
#[derive(Debug, Clone, Copy)]
pub struct CardView<'a> {
    pub record: &'a CardRecord,
    pub versions: &'a VersionGroup,
}

/// In-memory snapshot of the persisted dataset
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CardRecord>,
    groups: Vec<VersionGroup>,
    /// Card id to position in `records`
    by_id: HashMap<String, usize>,
    /// Group key to position in `groups`
    by_key: HashMap<String, usize>,
}

impl Catalog {
    /// Loads every record from `storage`
    ///
    /// # Returns
    ///
    /// * `Ok(Catalog)` - The dataset with version groups computed
    /// * `Err(DokkanError)` - The dataset could not be read
    pub fn load(storage: &dyn Storage) -> Result<Self, DokkanError> {
        Ok(Self::from_records(storage.load_cards()?))
    }

    /// Builds a catalog from records already in memory
    pub fn from_records(records: Vec<CardRecord>) -> Self {
        let groups = link_groups(&records);
        let by_id = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let by_key = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.key.clone(), i))
            .collect();

        Self {
            records,
            groups,
            by_id,
            by_key,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    pub fn groups(&self) -> &[VersionGroup] {
        &self.groups
    }

    /// Records matching `filter`, newest identifier first
    pub fn list(&self, filter: &CardFilter) -> Vec<&CardRecord> {
        let mut matching: Vec<&CardRecord> =
            self.records.iter().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| compare_ids(&a.id, &b.id));
        matching
    }

    /// Looks up one card and its version group
    pub fn get(&self, id: &str) -> Option<CardView<'_>> {
        let record = &self.records[*self.by_id.get(id)?];
        let versions = &self.groups[*self.by_key.get(&group_key(&record.name))?];
        Some(CardView { record, versions })
    }
}
