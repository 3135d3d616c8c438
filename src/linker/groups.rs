use crate::card::CardRecord;
use crate::linker::group_key;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Cards that are versions of the same character
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionGroup {
    pub key: String,
    /// Highest rarity first, then newest identifier first
    pub card_ids: Vec<String>,
}

impl VersionGroup {
    pub fn len(&self) -> usize {
        self.card_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.card_ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.card_ids.iter().any(|c| c == id)
    }
}

/// Orders identifiers numerically, descending; non-numeric after numeric
pub(crate) fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => y.cmp(&x),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}

/// Partitions records into version groups
///
/// The result depends only on the set of records, never on their input
/// order. Groups are sorted by key. A repeated identifier is kept once: the
/// entry whose name sorts first wins, then the one with the higher rarity.
///
/// # Arguments
///
/// * `records` - The records to group
///
/// # Returns
///
/// One `VersionGroup` per distinct group key
pub fn link_groups(records: &[CardRecord]) -> Vec<VersionGroup> {
    let mut canonical: HashMap<&str, &CardRecord> = HashMap::new();
    for record in records {
        canonical
            .entry(record.id.as_str())
            .and_modify(|kept| {
                if preferred(record, kept) == Ordering::Less {
                    *kept = record;
                }
            })
            .or_insert(record);
    }

    let mut by_key: BTreeMap<String, Vec<&CardRecord>> = BTreeMap::new();
    for record in canonical.into_values() {
        by_key.entry(group_key(&record.name)).or_default().push(record);
    }

    by_key
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(|a, b| {
                b.rarity
                    .rank()
                    .cmp(&a.rarity.rank())
                    .then_with(|| compare_ids(&a.id, &b.id))
            });
            VersionGroup {
                key,
                card_ids: members.into_iter().map(|r| r.id.clone()).collect(),
            }
        })
        .collect()
}

/// Ranks two records sharing an identifier; `Less` means `a` is kept
fn preferred(a: &CardRecord, b: &CardRecord) -> Ordering {
    a.name
        .cmp(&b.name)
        .then_with(|| b.rarity.rank().cmp(&a.rarity.rank()))
}

/// The version group containing `id`, if the card is in `records`
pub fn group_of(records: &[CardRecord], id: &str) -> Option<VersionGroup> {
    link_groups(records).into_iter().find(|g| g.contains(id))
}
