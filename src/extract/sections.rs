//! Text-section probes
//!
//! A detail page is flattened into trimmed text lines (one per text node,
//! script and style content excluded) and split on the known section
//! headers. Each cleaner turns one block of lines into an optional field.

use crate::card::{ActiveSkill, Attack};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static PERCENT_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*%$").expect("percent regex is valid"));
static SA_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSA\s*Lv\b").expect("SA level regex is valid"));
static RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Release Date\s+([0-9/.\-]+)\s+([0-9: ]+[AP]M)\s+([A-Z]{2,4})\b")
        .expect("release regex is valid")
});

/// Sections recognised on a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Section {
    LeaderSkill,
    SuperAttack,
    UltraSuperAttack,
    PassiveSkill,
    ActiveSkill,
    ActivationConditions,
    TransformationConditions,
    ReversalConditions,
    RelatedAnimations,
    LinkSkills,
    Categories,
    Stats,
}

impl Section {
    /// Matches a whole line against the header labels
    pub(crate) fn from_header(line: &str) -> Option<Self> {
        match line {
            "Leader Skill" => Some(Self::LeaderSkill),
            "Super Attack" => Some(Self::SuperAttack),
            "Ultra Super Attack" => Some(Self::UltraSuperAttack),
            "Passive Skill" => Some(Self::PassiveSkill),
            "Active Skill" => Some(Self::ActiveSkill),
            "Activation Condition(s)" | "Activation Conditions" => {
                Some(Self::ActivationConditions)
            }
            "Transformation Condition(s)" | "Transformation Conditions" => {
                Some(Self::TransformationConditions)
            }
            "Reversal Condition(s)" | "Reversal Conditions" => Some(Self::ReversalConditions),
            "Related Animation(s)" | "Related Animations" => Some(Self::RelatedAnimations),
            "Link Skills" => Some(Self::LinkSkills),
            "Categories" => Some(Self::Categories),
            "Stats" => Some(Self::Stats),
            _ => None,
        }
    }

    /// Returns true if `line` is any section header
    pub(crate) fn is_header(line: &str) -> bool {
        Self::from_header(line).is_some()
    }
}

/// Blocks of lines keyed by the header that introduced them
#[derive(Debug, Default)]
pub(crate) struct Sections {
    blocks: HashMap<Section, Vec<String>>,
}

impl Sections {
    pub(crate) fn get(&self, section: Section) -> &[String] {
        self.blocks.get(&section).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Collapses every whitespace run into a single space
pub(crate) fn condense(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an element with its text nodes joined by spaces
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    condense(&element.text().collect::<Vec<_>>().join(" "))
}

/// Flattens the page into its visible text lines
pub(crate) fn page_lines(tree: &Html) -> Vec<String> {
    let mut lines = Vec::new();

    for node in tree.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"))
            .unwrap_or(false);
        if hidden {
            continue;
        }

        let line = condense(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines
}

/// Splits lines into blocks at each section header
///
/// When a header appears more than once, the first block wins.
pub(crate) fn split_sections(lines: &[String]) -> Sections {
    let headers: Vec<(Section, usize)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| Section::from_header(line).map(|s| (s, i)))
        .collect();

    let mut blocks = HashMap::new();
    for (n, (section, start)) in headers.iter().enumerate() {
        let end = headers.get(n + 1).map(|(_, i)| *i).unwrap_or(lines.len());
        blocks
            .entry(*section)
            .or_insert_with(|| lines[start + 1..end].to_vec());
    }

    Sections { blocks }
}

/// Removes repeated sentences, keeping the first occurrence
pub(crate) fn dedup_sentences(text: &str) -> String {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            if let Some(&(next_idx, next_ch)) = chars.peek() {
                if next_ch.is_whitespace() {
                    sentences.push(&text[start..next_idx]);
                    start = next_idx;
                }
            }
        }
    }
    sentences.push(&text[start..]);

    let mut seen = HashSet::new();
    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins a block into one line; `None` if nothing is left
pub(crate) fn block_text(block: &[String]) -> Option<String> {
    let text = condense(&block.join(" "));
    (!text.is_empty()).then_some(text)
}

pub(crate) fn leader_skill(block: &[String]) -> Option<String> {
    let text = block_text(block)?;
    let text = dedup_sentences(&text);
    (!text.is_empty()).then_some(text)
}

/// Super attack or ultra super attack: name line, then effect lines
///
/// Percentage-only lines and `SA Lv` lines are display noise and dropped.
pub(crate) fn attack(block: &[String]) -> Option<Attack> {
    let (name, rest) = block.split_first()?;
    let name = condense(name);
    if name.is_empty() {
        return None;
    }

    let effects: Vec<String> = rest
        .iter()
        .map(|line| condense(line))
        .filter(|line| !line.is_empty())
        .filter(|line| !PERCENT_ONLY.is_match(line) && !SA_LEVEL.is_match(line))
        .collect();

    Some(Attack {
        name,
        effect: (!effects.is_empty()).then(|| effects.join("; ")),
    })
}

/// Active skill name and effect, with optional activation conditions
pub(crate) fn active_skill(block: &[String], conditions: &[String]) -> Option<ActiveSkill> {
    let (name, rest) = block.split_first()?;
    let name = condense(name);
    if name.is_empty() {
        return None;
    }

    let effects: Vec<String> = rest
        .iter()
        .map(|line| condense(line))
        .filter(|line| !line.is_empty())
        .collect();

    Some(ActiveSkill {
        name,
        effect: (!effects.is_empty()).then(|| effects.join("; ")),
        activation_conditions: block_text(conditions),
    })
}

/// De-duplicated lines, source order kept
pub(crate) fn distinct_lines(block: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    block
        .iter()
        .map(|line| condense(line))
        .filter(|line| !line.is_empty() && seen.insert(line.clone()))
        .collect()
}

/// Release date and timezone, e.g. `("10/3/2024 10:00:00 PM", "PDT")`
pub(crate) fn release(page_text: &str) -> (Option<String>, Option<String>) {
    match RELEASE.captures(page_text) {
        Some(caps) => (
            Some(format!("{} {}", &caps[1], condense(&caps[2]))),
            Some(caps[3].to_string()),
        ),
        None => (None, None),
    }
}
