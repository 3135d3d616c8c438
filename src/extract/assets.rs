//! Image probes: asset roles, rarity and type detection

use crate::card::{AssetRole, AssetSet, CardType, Rarity};
use crate::url::resolve_href;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static RARITY_ICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cha_rare(?:_sm)?_(lr|ur|ssr|sr|r|n)\.png").expect("rarity icon regex is valid")
});

/// Named type icons, e.g. `icon_type_teq.png`
static NAMED_TYPE_ICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)type[_-]?(?:icon[_-])?(str|teq|int|agl|phy)\b").expect("type icon regex is valid")
});

/// Numbered type icons: `cha_type_icon_<class><element>.png`
static NUMBERED_TYPE_ICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cha_type_icon_\d([0-4])\.png").expect("type icon regex is valid")
});

const RARITY_SELECTOR: &str = "div.card-icon-item.card-icon-item-rarity.card-info-above-thumb img[src]";
const TYPE_ROW_SELECTOR: &str =
    "div.row.justify-content-center.align-items-center.padding-top-bottom-10.border.border-2";

/// Collects every image URL on the page, absolute and de-duplicated
pub(crate) fn image_urls(tree: &Html, base: &Url) -> Vec<String> {
    let Ok(images) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    tree.select(&images)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| resolve_href(base, src))
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Assigns image URLs to asset roles
///
/// Rarity and type icons are recognised by filename prefix. Card art is
/// recognised by its suffix and must carry the card identifier, except under
/// `/character/card/` where the suffix alone is enough. The first match per
/// role wins.
pub(crate) fn classify_assets(image_urls: &[String], card_id: &str) -> AssetSet {
    let mut assets = AssetSet::default();

    for url in image_urls {
        let lower = url.to_lowercase();

        if lower.contains("cha_rare_") {
            assets.fill(AssetRole::RarityIcon, url);
        } else if lower.contains("cha_type_icon_") {
            assets.fill(AssetRole::TypeIcon, url);
        } else if url.contains(card_id) || lower.contains("/character/card/") {
            if let Some(role) = art_role(&lower) {
                assets.fill(role, url);
            }
        }
    }

    assets
}

fn art_role(lower_url: &str) -> Option<AssetRole> {
    if lower_url.contains("_bg.") {
        Some(AssetRole::Background)
    } else if lower_url.contains("_character.") {
        Some(AssetRole::Character)
    } else if lower_url.contains("_effect.") {
        Some(AssetRole::Effect)
    } else if lower_url.contains("_cutin.") {
        Some(AssetRole::Cutin)
    } else {
        None
    }
}

/// Rarity from the rarity icon, falling back to any matching image URL
pub(crate) fn detect_rarity(tree: &Html, image_urls: &[String]) -> Option<Rarity> {
    let from_icon = Selector::parse(RARITY_SELECTOR).ok().and_then(|sel| {
        tree.select(&sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(rarity_from_url)
    });

    from_icon.or_else(|| image_urls.iter().find_map(|url| rarity_from_url(url)))
}

fn rarity_from_url(url: &str) -> Option<Rarity> {
    RARITY_ICON
        .captures(url)
        .and_then(|caps| Rarity::from_db_string(&caps[1]))
}

/// Type from the type-coloured row, falling back to the type icon URL
pub(crate) fn detect_type(tree: &Html, image_urls: &[String]) -> Option<CardType> {
    let from_row = Selector::parse(TYPE_ROW_SELECTOR).ok().and_then(|sel| {
        let row = tree.select(&sel).next()?;
        type_from_classes(row.value().classes())
    });

    from_row.or_else(|| image_urls.iter().find_map(|url| type_from_icon_url(url)))
}

/// Reads the type from `border-<type>` / `bg-<type>` classes; the last one wins
pub(crate) fn type_from_classes<'a>(classes: impl Iterator<Item = &'a str>) -> Option<CardType> {
    classes
        .filter_map(|class| {
            class
                .strip_prefix("border-")
                .or_else(|| class.strip_prefix("bg-"))
        })
        .filter_map(CardType::from_db_string)
        .last()
}

fn type_from_icon_url(url: &str) -> Option<CardType> {
    if let Some(caps) = NAMED_TYPE_ICON.captures(url) {
        return CardType::from_db_string(&caps[1]);
    }
    let caps = NUMBERED_TYPE_ICON.captures(url)?;
    match &caps[1] {
        "0" => Some(CardType::Agl),
        "1" => Some(CardType::Teq),
        "2" => Some(CardType::Int),
        "3" => Some(CardType::Str),
        "4" => Some(CardType::Phy),
        _ => None,
    }
}
