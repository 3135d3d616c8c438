//! JSON export of the full dataset
//!
//! The export is written to a sibling temporary file and renamed into place,
//! so a reader never sees a half-written file.

use crate::card::CardRecord;
use crate::linker::{link_groups, VersionGroup};
use crate::storage::Storage;
use crate::DokkanError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Document written by `export_dataset`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetExport {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub cards: Vec<CardRecord>,
    pub version_groups: Vec<VersionGroup>,
}

impl DatasetExport {
    /// Builds the export document; groups are recomputed from `cards`
    pub fn new(cards: Vec<CardRecord>) -> Self {
        let version_groups = link_groups(&cards);
        Self {
            generated_at: Utc::now(),
            count: cards.len(),
            cards,
            version_groups,
        }
    }
}

/// Writes every record and its version groups to `path` as pretty JSON
///
/// # Arguments
///
/// * `storage` - The dataset to export
/// * `path` - Destination file; its parent directory is created if missing
///
/// # Returns
///
/// * `Ok(usize)` - Number of records exported
/// * `Err(DokkanError)` - Reading the dataset or writing the file failed
pub fn export_dataset(storage: &dyn Storage, path: &Path) -> Result<usize, DokkanError> {
    let export = DatasetExport::new(storage.load_cards()?);
    let json = serde_json::to_string_pretty(&export)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".tmp");
    fs::write(&partial, json)?;
    fs::rename(&partial, path)?;

    tracing::info!(
        "Exported {} cards in {} version groups to {}",
        export.count,
        export.version_groups.len(),
        path.display()
    );
    Ok(export.count)
}
