//! Detail page extraction
//!
//! Each field is an independent probe. Mandatory probes (name, rarity, type)
//! fail the whole extraction; every other probe degrades to `None` or empty.

use crate::card::{CardRecord, PassiveEffect, PassiveSkill};
use crate::extract::assets::{classify_assets, detect_rarity, detect_type, image_urls};
use crate::extract::panels::{categories, domain_effects, eza_info};
use crate::extract::passive::structured_passive;
use crate::extract::sections::{
    active_skill, attack, block_text, condense, distinct_lines, element_text, leader_skill,
    page_lines, release, split_sections, Section, Sections,
};
use crate::extract::stats::stats;
use crate::extract::{Document, ExtractionError};
use crate::linker::group_key;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Variant strip at the top of a detail page
const VARIANT_STRIP_SELECTOR: &str =
    "div.row.cursor-pointer.unselectable.border.border-2.border-dark.margin-top-bottom-5";

static CARD_ID_IN_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)card_(\d+)_").expect("card src regex is valid"));

/// Extracts a card record from its detail page
///
/// # Arguments
///
/// * `doc` - The fetched detail page
/// * `id` - The card identifier the page was fetched for
///
/// # Returns
///
/// * `Ok(CardRecord)` - The record; optional fields the page lacks are `None` or empty
/// * `Err(ExtractionError)` - The page is blank, or a mandatory field is missing
pub fn extract_detail(doc: &Document, id: &str) -> Result<CardRecord, ExtractionError> {
    if doc.is_blank() {
        return Err(ExtractionError::EmptyDocument {
            url: doc.url().to_string(),
        });
    }

    let tree = doc.tree();
    let lines = page_lines(&tree);
    let page_text = lines.join("\n");
    let sections = split_sections(&lines);
    let images = image_urls(&tree, doc.url());

    let missing = |field: &'static str| ExtractionError::MissingField {
        id: id.to_string(),
        field,
    };

    let title = page_title(&tree);
    let name = heading(&tree)
        .or_else(|| title.clone())
        .ok_or_else(|| missing("name"))?;
    let rarity = detect_rarity(&tree, &images).ok_or_else(|| missing("rarity"))?;
    let card_type = detect_type(&tree, &images).ok_or_else(|| missing("type"))?;

    let (release_date, release_timezone) = release(&page_text);
    let related_animations = Some(distinct_lines(sections.get(Section::RelatedAnimations)))
        .filter(|labels| !labels.is_empty());

    Ok(CardRecord {
        id: id.to_string(),
        group_key: group_key(&name),
        name,
        title,
        rarity,
        card_type,
        assets: classify_assets(&images, id),
        eza: eza_info(&tree, &page_text),
        leader_skill: leader_skill(sections.get(Section::LeaderSkill)),
        super_attack: attack(sections.get(Section::SuperAttack)),
        ultra_super_attack: attack(sections.get(Section::UltraSuperAttack)),
        passive_skill: passive_skill(&tree, &sections),
        active_skill: active_skill(
            sections.get(Section::ActiveSkill),
            sections.get(Section::ActivationConditions),
        ),
        categories: categories(&tree, sections.get(Section::Categories)),
        link_skills: distinct_lines(sections.get(Section::LinkSkills)),
        stats: stats(&tree, &page_text, sections.get(Section::Stats)),
        transformation_condition: block_text(sections.get(Section::TransformationConditions)),
        reversal_condition: block_text(sections.get(Section::ReversalConditions)),
        related_animations,
        release_date,
        release_timezone,
        domain_effects: domain_effects(&tree),
        source_url: doc.url().to_string(),
    })
}

/// Identifiers of the other versions shown in the variant strip
///
/// The first tile is the card itself and is skipped.
pub fn extract_related_ids(doc: &Document) -> Vec<String> {
    let tree = doc.tree();
    let (Ok(strip_sel), Ok(tile_sel), Ok(img_sel)) = (
        Selector::parse(VARIANT_STRIP_SELECTOR),
        Selector::parse("div.col-5"),
        Selector::parse("img[src]"),
    ) else {
        return Vec::new();
    };

    let Some(strip) = tree.select(&strip_sel).next() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    strip
        .select(&tile_sel)
        .skip(1)
        .filter_map(|tile| tile.select(&img_sel).next())
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| CARD_ID_IN_SRC.captures(src).map(|caps| caps[1].to_string()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn heading(tree: &Html) -> Option<String> {
    let h1 = Selector::parse("h1").ok()?;
    tree.select(&h1)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn page_title(tree: &Html) -> Option<String> {
    let title = Selector::parse("title").ok()?;
    tree.select(&title)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Structured passive sections when the panel has them, flat text otherwise
fn passive_skill(tree: &Html, sections: &Sections) -> Option<PassiveSkill> {
    let structured = structured_passive(tree);
    let block = sections.get(Section::PassiveSkill);

    if !structured.sections.is_empty() {
        return Some(PassiveSkill {
            name: structured
                .name
                .or_else(|| block.first().map(|line| condense(line))),
            effect: PassiveEffect::Structured {
                sections: structured.sections,
            },
        });
    }

    if block.is_empty() {
        return None;
    }

    let (name, body): (Option<String>, Vec<String>) = match structured.name {
        Some(name) => {
            let body = block.iter().filter(|line| **line != name).cloned().collect();
            (Some(name), body)
        }
        None if block.len() > 1 => (Some(condense(&block[0])), block[1..].to_vec()),
        None => (None, block.to_vec()),
    };

    let text = block_text(&body).or_else(|| block_text(block))?;
    Some(PassiveSkill {
        name,
        effect: PassiveEffect::Flat { text },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardType, Rarity};

    const CARD_PAGE: &str = r#"
        <html><head><title>Dokkan Info - Son Goku</title></head><body>
          <div class="row cursor-pointer unselectable border border-2 border-dark margin-top-bottom-5">
            <div class="col-5"><img src="/assets/card_1001_thumb.png"></div>
            <div class="col-5"><img src="/assets/card_1002_thumb.png"></div>
            <div class="col-5"><img src="/assets/card_1003_thumb.png"></div>
            <div class="col-5"><img src="/assets/card_1002_thumb.png"></div>
          </div>
          <h1>Son Goku [Super Saiyan]</h1>
          <div class="card-icon-item card-icon-item-rarity card-info-above-thumb">
            <img src="/layout/cha_rare_sm_lr.png">
          </div>
          <div class="row justify-content-center align-items-center padding-top-bottom-10 border border-2 border-agl">
            <img src="/character/card/card_1001_character.png">
          </div>
          <div><b>Leader Skill</b></div><div>AGL Type Ki +3.</div>
          <div><b>Super Attack</b></div><div>Super Kamehameha</div><div>Causes supreme damage</div><div>SA Lv 15</div>
          <div class="row"><div class="col-sm-4"><b>Passive Skill</b></div><div class="col-sm-8"><b>Fierce Battle</b></div></div>
          <div class="row">ATK +150%</div>
          <div><b>Link Skills</b></div><div>Super Saiyan</div><div>Kamehameha</div>
          <div><b>Categories</b></div>
          <a href="/categories/4"><img alt="Goku's Family" src="/c.png"></a>
          <div><b>Stats</b></div>
          <div>Cost: 58</div>
          <div>Release Date 10/3/2024 10:00:00 PM PDT</div>
        </body></html>"#;

    fn doc(html: &str) -> Document {
        Document::parse("https://dokkaninfo.com/cards/1001", html).unwrap()
    }

    #[test]
    fn test_extract_full_record() {
        let record = extract_detail(&doc(CARD_PAGE), "1001").unwrap();

        assert_eq!(record.id, "1001");
        assert_eq!(record.name, "Son Goku [Super Saiyan]");
        assert_eq!(record.group_key, "Son Goku");
        assert_eq!(record.title.as_deref(), Some("Dokkan Info - Son Goku"));
        assert_eq!(record.rarity, Rarity::LR);
        assert_eq!(record.card_type, CardType::Agl);
        assert_eq!(record.leader_skill.as_deref(), Some("AGL Type Ki +3."));

        let super_attack = record.super_attack.unwrap();
        assert_eq!(super_attack.name, "Super Kamehameha");
        assert_eq!(super_attack.effect.as_deref(), Some("Causes supreme damage"));

        let passive = record.passive_skill.unwrap();
        assert_eq!(passive.name.as_deref(), Some("Fierce Battle"));
        assert_eq!(
            passive.effect,
            PassiveEffect::Flat {
                text: "ATK +150%".to_string()
            }
        );

        assert_eq!(record.link_skills, vec!["Super Saiyan", "Kamehameha"]);
        assert_eq!(record.categories, vec!["Goku's Family"]);
        assert_eq!(record.stats.general_info["Cost"], 58);
        assert_eq!(record.release_date.as_deref(), Some("10/3/2024 10:00:00 PM"));
        assert_eq!(record.release_timezone.as_deref(), Some("PDT"));
        assert_eq!(
            record.assets.character.as_deref(),
            Some("https://dokkaninfo.com/character/card/card_1001_character.png")
        );
        assert_eq!(record.source_url, "https://dokkaninfo.com/cards/1001");
    }

    #[test]
    fn test_missing_optional_fields_are_absent() {
        let record = extract_detail(&doc(CARD_PAGE), "1001").unwrap();
        assert!(record.ultra_super_attack.is_none());
        assert!(record.active_skill.is_none());
        assert!(record.transformation_condition.is_none());
        assert!(record.related_animations.is_none());
        assert!(record.domain_effects.is_empty());
        assert!(!record.eza.has_eza);

        // Absent fields serialize as explicit nulls
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["ultraSuperAttack"].is_null());
        assert!(json.as_object().unwrap().contains_key("activeSkill"));
    }

    #[test]
    fn test_missing_rarity_names_field() {
        let html = CARD_PAGE.replace("cha_rare_sm_lr.png", "blank.png");
        let err = extract_detail(&doc(&html), "1001").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MissingField { field: "rarity", .. }
        ));
    }

    #[test]
    fn test_missing_type_names_field() {
        let html = CARD_PAGE.replace("border-agl", "border-dark");
        let err = extract_detail(&doc(&html), "1001").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingField { field: "type", .. }));
    }

    #[test]
    fn test_name_falls_back_to_title() {
        let html = CARD_PAGE.replace("<h1>Son Goku [Super Saiyan]</h1>", "");
        let record = extract_detail(&doc(&html), "1001").unwrap();
        assert_eq!(record.name, "Dokkan Info - Son Goku");
    }

    #[test]
    fn test_blank_page() {
        let err = extract_detail(&doc("   "), "1001").unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument { .. }));
    }

    #[test]
    fn test_related_ids_skip_first_tile() {
        assert_eq!(extract_related_ids(&doc(CARD_PAGE)), vec!["1002", "1003"]);
        assert!(extract_related_ids(&doc("<p>no strip</p>")).is_empty());
    }
}
