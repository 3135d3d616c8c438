//! Stats probe
//!
//! General info (Cost, Max Lv, SA Lv) comes from the page text. Base stats
//! and hidden-potential buckets come from the stats table, keyed by its
//! header columns ("Base Min", "Base Max", "55%", "100%", ...). Pages without
//! a table fall back to whitespace-separated text rows.

use crate::card::{StatRange, StatsBlock};
use crate::extract::sections::element_text;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

const STAT_NAMES: [&str; 3] = ["HP", "ATK", "DEF"];
const BASE_MIN: &str = "Base Min";
const BASE_MAX: &str = "Base Max";

static GENERAL_INFO: LazyLock<[(&'static str, Regex); 3]> = LazyLock::new(|| {
    [
        (
            "Cost",
            Regex::new(r"(?i)\bCost\s*:\s*(\d+)").expect("cost regex is valid"),
        ),
        (
            "Max Lv",
            Regex::new(r"(?i)\bMax\s*Lv\s*:\s*(\d+)").expect("max level regex is valid"),
        ),
        (
            "SA Lv",
            Regex::new(r"(?i)\bSA\s*Lv\s*:\s*(\d+)").expect("SA level regex is valid"),
        ),
    ]
});

static TEXT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(HP|ATK|DEF)\s+([0-9,]+)\s+([0-9,]+)\s+([0-9,]+)\s+([0-9,]+)$")
        .expect("stat row regex is valid")
});

fn parse_number(text: &str) -> Option<u64> {
    text.trim().replace(',', "").parse().ok()
}

/// Builds the stats block of a detail page
///
/// # Arguments
///
/// * `tree` - The parsed page
/// * `page_text` - The page's text lines joined by newlines
/// * `stats_block` - Lines of the "Stats" text section (used when no table exists)
pub(crate) fn stats(tree: &Html, page_text: &str, stats_block: &[String]) -> StatsBlock {
    let mut block = StatsBlock {
        general_info: general_info(page_text),
        ..StatsBlock::default()
    };

    let rows = match find_stats_table(tree) {
        Some(table) => table_rows(table),
        None => text_rows(stats_block),
    };

    for (stat, columns) in rows {
        if let (Some(&min), Some(&max)) = (columns.get(BASE_MIN), columns.get(BASE_MAX)) {
            block.base_stats.insert(stat.clone(), StatRange { min, max });
        }
        for (column, value) in columns {
            if column.ends_with('%') {
                block
                    .hidden_potential
                    .entry(column)
                    .or_default()
                    .insert(stat.clone(), value);
            }
        }
    }

    block
}

fn general_info(page_text: &str) -> BTreeMap<String, u64> {
    GENERAL_INFO
        .iter()
        .filter_map(|(label, regex)| {
            let caps = regex.captures(page_text)?;
            Some((label.to_string(), parse_number(&caps[1])?))
        })
        .collect()
}

fn find_stats_table(tree: &Html) -> Option<ElementRef<'_>> {
    let tables = Selector::parse("table").ok()?;
    let rows = Selector::parse("tr").ok()?;
    let headers = Selector::parse("th").ok()?;

    tree.select(&tables).find(|table| {
        let header_says_stats = table
            .select(&rows)
            .next()
            .map(|row| row.select(&headers).any(|th| element_text(th) == "Stats"))
            .unwrap_or(false);
        let text = element_text(*table);
        header_says_stats || STAT_NAMES.iter().all(|name| text.contains(name))
    })
}

/// Reads `stat → column → value` from a table whose first row is the header
fn table_rows(table: ElementRef<'_>) -> Vec<(String, BTreeMap<String, u64>)> {
    let (Ok(row_sel), Ok(header_sel), Ok(cell_sel)) = (
        Selector::parse("tr"),
        Selector::parse("th"),
        Selector::parse("th, td"),
    ) else {
        return Vec::new();
    };

    let mut rows = table.select(&row_sel);
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row.select(&header_sel).map(element_text).collect();

    let mut parsed = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
        let Some((stat, values)) = cells.split_first() else {
            continue;
        };
        if !STAT_NAMES.contains(&stat.as_str()) {
            continue;
        }

        let columns: BTreeMap<String, u64> = values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                let column = headers.get(i + 1)?;
                Some((column.clone(), parse_number(value)?))
            })
            .collect();

        if !columns.is_empty() {
            parsed.push((stat.clone(), columns));
        }
    }

    parsed
}

/// Reads `HP 1 2 3 4` style rows from the text section
fn text_rows(block: &[String]) -> Vec<(String, BTreeMap<String, u64>)> {
    block
        .iter()
        .filter_map(|line| {
            let caps = TEXT_ROW.captures(line)?;
            let columns: BTreeMap<String, u64> = [BASE_MIN, BASE_MAX, "55%", "100%"]
                .iter()
                .enumerate()
                .filter_map(|(i, column)| Some((column.to_string(), parse_number(&caps[i + 2])?)))
                .collect();
            Some((caps[1].to_ascii_uppercase(), columns))
        })
        .collect()
}
