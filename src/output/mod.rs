//! Output module for reading the dataset back out
//!
//! This module handles:
//! - Read-only catalog queries (list with filters, detail with versions)
//! - Exporting the dataset as JSON
//! - Dataset statistics

mod catalog;
mod export;
pub mod stats;

pub use catalog::{CardFilter, CardView, Catalog};
pub use export::{export_dataset, DatasetExport};
pub use stats::{load_statistics, print_statistics, DatasetStatistics};
