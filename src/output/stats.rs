//! Statistics generation from the card dataset
//!
//! This module provides functionality for extracting and displaying
//! dataset statistics from the storage layer.

use crate::card::{CardType, Rarity};
use crate::storage::{RunRecord, Storage};
use crate::DokkanError;
use std::collections::HashMap;

/// Dataset statistics summary
#[derive(Debug, Clone)]
pub struct DatasetStatistics {
    /// Total number of stored cards
    pub total_cards: u64,

    /// Count of cards by rarity
    pub cards_by_rarity: HashMap<Rarity, u64>,

    /// Count of cards by type
    pub cards_by_type: HashMap<CardType, u64>,

    /// Number of distinct version groups
    pub version_groups: u64,

    /// Detail pages waiting in the persisted frontier
    pub pending_details: usize,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(DatasetStatistics)` - Successfully loaded statistics
/// * `Err(DokkanError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<DatasetStatistics, DokkanError> {
    let pending_details = storage
        .load_frontier()?
        .map(|cursor| cursor.pending_details())
        .unwrap_or(0);

    Ok(DatasetStatistics {
        total_cards: storage.count_cards()?,
        cards_by_rarity: storage.count_cards_by_rarity()?,
        cards_by_type: storage.count_cards_by_type()?,
        version_groups: storage.count_groups()?,
        pending_details,
        latest_run: storage.get_latest_run()?,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Overview:");
    println!("  Total cards: {}", stats.total_cards);
    println!("  Version groups: {}", stats.version_groups);
    println!("  Pending detail pages: {}", stats.pending_details);
    println!();

    println!("Cards by Rarity:");
    // Highest rarity first
    for rarity in Rarity::all_rarities().into_iter().rev() {
        let count = stats.cards_by_rarity.get(&rarity).copied().unwrap_or(0);
        if count > 0 {
            println!(
                "  {}: {} ({:.1}%)",
                rarity,
                count,
                percentage(count, stats.total_cards)
            );
        }
    }
    println!();

    println!("Cards by Type:");
    for card_type in CardType::all_types() {
        let count = stats.cards_by_type.get(&card_type).copied().unwrap_or(0);
        if count > 0 {
            println!(
                "  {}: {} ({:.1}%)",
                card_type,
                count,
                percentage(count, stats.total_cards)
            );
        }
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Id: {}", run.id);
        println!("  Started: {}", run.started_at);
        match &run.finished_at {
            Some(finished) => println!("  Finished: {} ({})", finished, run.status),
            None => println!("  Finished: never (interrupted)"),
        }
        println!("  New cards: {}", run.items_committed);
    }
}
