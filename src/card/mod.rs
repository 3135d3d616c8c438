//! Card data model
//!
//! # Components
//!
//! - `CardRecord`: the structured record extracted from one detail page
//! - `Rarity` / `CardType`: the enumerations used for ordering and filtering
//! - `fingerprint`: content hashing used to detect changed records

mod fingerprint;
mod rarity;
mod record;

pub use fingerprint::{fingerprint, is_valid_fingerprint, FINGERPRINT_LEN};
pub use rarity::{CardType, Rarity};
pub use record::{
    ActiveSkill, AssetRole, AssetSet, Attack, CardRecord, DomainEffect, EzaInfo, PassiveEffect,
    PassiveSection, PassiveSkill, StatRange, StatsBlock,
};
