//! Extractor: fetched documents in, card records out
//!
//! # Components
//!
//! - `Document`: the uniform page handed over by either fetch strategy
//! - `list`: detail candidates and the next-page flag of a list page
//! - `detail`: the full `CardRecord` of a detail page
//! - `sections`, `passive`, `stats`, `assets`, `panels`: the individual probes
//!
//! Probes for optional fields never fail; only the mandatory identity fields
//! (name, rarity, type) produce an `ExtractionError`.

mod assets;
mod detail;
mod document;
mod list;
mod panels;
mod passive;
mod sections;
mod stats;

pub use detail::{extract_detail, extract_related_ids};
pub use document::Document;
pub use list::{extract_list, ListCandidate, ListPage};

use thiserror::Error;

/// Errors raised while extracting a record
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Card {id}: mandatory field '{field}' not found")]
    MissingField { id: String, field: &'static str },

    #[error("Empty document: {url}")]
    EmptyDocument { url: String },
}
