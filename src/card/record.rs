//! Card record types
//!
//! A `CardRecord` is the structured form of one card detail page. Optional
//! fields serialize as explicit `null` so every persisted record carries the
//! full field set.

use crate::card::{CardType, Rarity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Structured record of one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Site-assigned identifier, stable across fetches
    pub id: String,
    pub name: String,
    /// Page title as displayed by the catalog
    pub title: Option<String>,
    pub rarity: Rarity,
    #[serde(rename = "type")]
    pub card_type: CardType,
    /// Normalized base name shared by every version of the character
    pub group_key: String,
    pub assets: AssetSet,
    pub eza: EzaInfo,
    pub leader_skill: Option<String>,
    pub super_attack: Option<Attack>,
    pub ultra_super_attack: Option<Attack>,
    pub passive_skill: Option<PassiveSkill>,
    pub active_skill: Option<ActiveSkill>,
    pub categories: Vec<String>,
    pub link_skills: Vec<String>,
    pub stats: StatsBlock,
    pub transformation_condition: Option<String>,
    pub reversal_condition: Option<String>,
    pub related_animations: Option<Vec<String>>,
    pub release_date: Option<String>,
    pub release_timezone: Option<String>,
    pub domain_effects: Vec<DomainEffect>,
    pub source_url: String,
}

/// Asset URLs referenced by a card page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSet {
    pub background: Option<String>,
    pub effect: Option<String>,
    pub character: Option<String>,
    pub cutin: Option<String>,
    pub rarity_icon: Option<String>,
    pub type_icon: Option<String>,
}

impl AssetSet {
    /// Returns the present asset URLs paired with their role
    pub fn entries(&self) -> Vec<(AssetRole, &str)> {
        [
            (AssetRole::Background, &self.background),
            (AssetRole::Effect, &self.effect),
            (AssetRole::Character, &self.character),
            (AssetRole::Cutin, &self.cutin),
            (AssetRole::RarityIcon, &self.rarity_icon),
            (AssetRole::TypeIcon, &self.type_icon),
        ]
        .into_iter()
        .filter_map(|(role, url)| url.as_deref().map(|u| (role, u)))
        .collect()
    }

    /// Returns true if no asset was found
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Stores `url` under `role` unless that slot is already filled
    pub fn fill(&mut self, role: AssetRole, url: &str) {
        let slot = match role {
            AssetRole::Background => &mut self.background,
            AssetRole::Effect => &mut self.effect,
            AssetRole::Character => &mut self.character,
            AssetRole::Cutin => &mut self.cutin,
            AssetRole::RarityIcon => &mut self.rarity_icon,
            AssetRole::TypeIcon => &mut self.type_icon,
        };
        if slot.is_none() {
            *slot = Some(url.to_string());
        }
    }
}

/// Role of an asset within a card page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    Background,
    Effect,
    Character,
    Cutin,
    RarityIcon,
    TypeIcon,
}

impl AssetRole {
    /// Returns the name used for the stored asset file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Effect => "effect",
            Self::Character => "character",
            Self::Cutin => "cutin",
            Self::RarityIcon => "rarity_icon",
            Self::TypeIcon => "type_icon",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extreme Z-Awakening status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EzaInfo {
    pub has_eza: bool,
    pub is_seza: bool,
    pub eza_step: Option<u8>,
    pub original_release_date: Option<String>,
    pub eza_release_date: Option<String>,
}

/// Super attack or ultra super attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    pub name: String,
    pub effect: Option<String>,
}

/// Active skill with its activation conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSkill {
    pub name: String,
    pub effect: Option<String>,
    pub activation_conditions: Option<String>,
}

/// Passive skill, either structured into sections or kept as flat text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveSkill {
    pub name: Option<String>,
    pub effect: PassiveEffect,
}

/// Body of a passive skill
///
/// Exactly one representation is carried per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PassiveEffect {
    Structured { sections: Vec<PassiveSection> },
    Flat { text: String },
}

/// One condition header of a passive skill and the effects listed under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveSection {
    pub condition: String,
    pub effects: Vec<String>,
}

/// Minimum and maximum of a base stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRange {
    pub min: u64,
    pub max: u64,
}

/// Stats block of a card
///
/// Maps are ordered so that serialization (and therefore the content
/// fingerprint) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBlock {
    /// Cost, Max Lv, SA Lv
    pub general_info: BTreeMap<String, u64>,
    /// HP / ATK / DEF ranges
    pub base_stats: BTreeMap<String, StatRange>,
    /// Percentage bucket (e.g. "55%") to per-stat value
    pub hidden_potential: BTreeMap<String, BTreeMap<String, u64>>,
}

impl StatsBlock {
    pub fn is_empty(&self) -> bool {
        self.general_info.is_empty() && self.base_stats.is_empty() && self.hidden_potential.is_empty()
    }
}

/// Domain effect shown on some cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEffect {
    pub name: Option<String>,
    pub effect: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<CardType>,
}
