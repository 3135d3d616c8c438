/// Rarity and type enumerations for cards
///
/// Both enums round-trip through the lowercase tokens the catalog uses in
/// its asset filenames and CSS classes, and through the uppercase labels used
/// in the persisted dataset.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rarity tier of a card, from N (lowest) to LR (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rarity {
    N,
    R,
    SR,
    SSR,
    UR,
    LR,
}

impl Rarity {
    /// Returns the ordering rank used when sorting versions of a character
    ///
    /// LR=5, UR=4, SSR=3, SR=2, R=1, N=0.
    pub fn rank(&self) -> u8 {
        match self {
            Self::N => 0,
            Self::R => 1,
            Self::SR => 2,
            Self::SSR => 3,
            Self::UR => 4,
            Self::LR => 5,
        }
    }

    /// Converts the rarity to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::N => "N",
            Self::R => "R",
            Self::SR => "SR",
            Self::SSR => "SSR",
            Self::UR => "UR",
            Self::LR => "LR",
        }
    }

    /// Parses a rarity from a database string or a site token
    ///
    /// Matching is case-insensitive so `"lr"` from an icon filename and
    /// `"LR"` from the dataset both resolve.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N" => Some(Self::N),
            "R" => Some(Self::R),
            "SR" => Some(Self::SR),
            "SSR" => Some(Self::SSR),
            "UR" => Some(Self::UR),
            "LR" => Some(Self::LR),
            _ => None,
        }
    }

    /// Returns all rarities, lowest first
    pub fn all_rarities() -> Vec<Self> {
        vec![Self::N, Self::R, Self::SR, Self::SSR, Self::UR, Self::LR]
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Combat type of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardType {
    Str,
    Teq,
    Int,
    Agl,
    Phy,
}

impl CardType {
    /// Converts the type to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Str => "STR",
            Self::Teq => "TEQ",
            Self::Int => "INT",
            Self::Agl => "AGL",
            Self::Phy => "PHY",
        }
    }

    /// Parses a type from a database string or a CSS class suffix
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STR" => Some(Self::Str),
            "TEQ" => Some(Self::Teq),
            "INT" => Some(Self::Int),
            "AGL" => Some(Self::Agl),
            "PHY" => Some(Self::Phy),
            _ => None,
        }
    }

    /// Returns all card types
    pub fn all_types() -> Vec<Self> {
        vec![Self::Str, Self::Teq, Self::Int, Self::Agl, Self::Phy]
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
