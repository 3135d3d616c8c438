//! DOM panel probes: EZA status, domain effects, categories

use crate::card::{DomainEffect, EzaInfo};
use crate::extract::assets::type_from_classes;
use crate::extract::sections::{condense, element_text, Section};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Step of a super extreme awakening
const SEZA_STEP: u8 = 4;

static RELEASE_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(EZA )?Release Date\s+(\d+/\d+/\d+\s+\d+:\d+:\d+\s+[AP]M\s+[A-Z]+)")
        .expect("release stamp regex is valid")
});

static FILE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpg|jpeg|gif|webp)$").expect("extension regex is valid")
});

static NUMERIC_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s%:]+$").expect("numeric regex is valid"));

/// Lowercase labels that show up among category images but are not categories
const CATEGORY_NOISE: &[&str] = &[
    "background",
    "icon",
    "rarity",
    "element",
    "eza",
    "undefined",
    "venatus",
    "show more",
    "links",
    "categories",
];

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn nearest_ancestor<'a>(
    element: ElementRef<'a>,
    pred: impl Fn(ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && pred(*el))
}

fn following_divs(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "div")
}

// ===== EZA =====

fn is_eza_toggle(row: ElementRef<'_>) -> bool {
    let text = element_text(row);
    text.contains("PRE-EZA") && text.contains("EZA")
}

/// EZA status from the PRE-EZA / EZA toggle and the step selector
///
/// # Arguments
///
/// * `tree` - The parsed page
/// * `page_text` - The page's text lines joined by newlines
pub(crate) fn eza_info(tree: &Html, page_text: &str) -> EzaInfo {
    let mut info = EzaInfo::default();

    let Ok(rows) = Selector::parse("div.row") else {
        return info;
    };

    // Innermost row holding the toggle, so its siblings are the step rows
    let toggle = tree.select(&rows).filter(|row| is_eza_toggle(*row)).find(|row| {
        !row.select(&rows)
            .any(|inner| inner.id() != row.id() && is_eza_toggle(inner))
    });
    let Some(toggle) = toggle else {
        return info;
    };
    info.has_eza = true;

    let step_row = following_divs(toggle).find(|el| has_class(*el, "row"));
    if let Some(step_row) = step_row.filter(|row| element_text(*row).contains("Step:")) {
        let step = Selector::parse("span.multiselect__single")
            .ok()
            .and_then(|sel| step_row.select(&sel).next())
            .and_then(|span| element_text(span).parse::<u8>().ok());
        info.eza_step = step;
        info.is_seza = step == Some(SEZA_STEP);
    }

    for caps in RELEASE_STAMP.captures_iter(page_text) {
        let stamp = condense(&caps[2]);
        let slot = if caps.get(1).is_some() {
            &mut info.eza_release_date
        } else {
            &mut info.original_release_date
        };
        if slot.is_none() {
            *slot = Some(stamp);
        }
    }

    info
}

// ===== Domains =====

/// Domain effect panels, de-duplicated on (name, effect)
pub(crate) fn domain_effects(tree: &Html) -> Vec<DomainEffect> {
    let Ok(bold) = Selector::parse("b") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut domains = Vec::new();

    for label in tree
        .select(&bold)
        .filter(|b| element_text(*b).eq_ignore_ascii_case("Domain Effect(s)"))
    {
        let Some(outer_row) = nearest_ancestor(label, |el| has_class(el, "row")) else {
            continue;
        };

        let name = outer_row
            .select(&bold)
            .nth(1)
            .map(element_text)
            .filter(|n| !n.is_empty());

        let card_type = nearest_ancestor(outer_row, |el| has_class(el, "border"))
            .and_then(|container| type_from_classes(container.value().classes()));

        let effect = domain_effect_text(outer_row);

        let key = (name.clone().unwrap_or_default(), effect.clone().unwrap_or_default());
        if seen.insert(key) {
            domains.push(DomainEffect {
                name,
                effect,
                card_type,
            });
        }
    }

    domains
}

fn is_effect_panel(element: ElementRef<'_>) -> bool {
    element
        .value()
        .classes()
        .any(|c| c.starts_with("bg-") && c.ends_with("-2"))
}

/// Text of the first `bg-*-2` panel within three sibling rows
fn domain_effect_text(outer_row: ElementRef<'_>) -> Option<String> {
    let divs = Selector::parse("div").ok()?;

    for row in following_divs(outer_row).take(3) {
        if is_effect_panel(row) {
            return Some(element_text(row)).filter(|t| !t.is_empty());
        }
        if let Some(deep) = row.select(&divs).find(|el| is_effect_panel(*el)) {
            return Some(element_text(deep)).filter(|t| !t.is_empty());
        }
    }

    None
}

// ===== Categories =====

/// Categories from category links and label images, merged in order
///
/// `text_block` is the "Categories" text section, used when the page has
/// neither links nor label images.
pub(crate) fn categories(tree: &Html, text_block: &[String]) -> Vec<String> {
    let mut raw: Vec<String> = Vec::new();

    for css in [
        r#"a[href*="/categories/"] img"#,
        r#"img[src*="/card_category/label/"]"#,
    ] {
        if let Ok(selector) = Selector::parse(css) {
            raw.extend(tree.select(&selector).filter_map(|img| {
                img.value()
                    .attr("alt")
                    .filter(|a| !a.trim().is_empty())
                    .or_else(|| img.value().attr("title"))
                    .map(str::to_string)
            }));
        }
    }

    if let Ok(selector) = Selector::parse(r#"a[href*="/categories/"]"#) {
        raw.extend(tree.select(&selector).map(element_text));
    }

    if raw.iter().all(|c| c.trim().is_empty()) {
        raw = text_block.to_vec();
    }

    clean_categories(raw)
}

/// Drops noise labels, filenames, numbers and duplicates
pub(crate) fn clean_categories(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();

    raw.into_iter()
        .map(|c| condense(c.trim_matches(|ch: char| ch == '•' || ch == '·' || ch.is_whitespace())))
        .filter(|c| !c.is_empty())
        .filter(|c| !CATEGORY_NOISE.contains(&c.to_lowercase().as_str()))
        .filter(|c| !FILE_EXTENSION.is_match(c))
        .filter(|c| !NUMERIC_NOISE.is_match(c))
        .filter(|c| !Section::is_header(c) && !c.contains("Links:") && !c.contains("Show More"))
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;

    #[test]
    fn test_no_eza() {
        let tree = Html::parse_document("<div class='row'>Leader Skill</div>");
        assert_eq!(eza_info(&tree, ""), EzaInfo::default());
    }

    #[test]
    fn test_seza_step() {
        let html = r#"
            <div class="row outer">
              <div class="row"><button>PRE-EZA</button><button>EZA</button></div>
              <div class="row">Step: <span class="multiselect__single">4</span></div>
            </div>"#;
        let text = "Release Date 5/1/2020 2:00:00 AM PDT\nEZA Release Date 9/20/2024 1:00:00 AM PDT";
        let info = eza_info(&Html::parse_document(html), text);

        assert!(info.has_eza);
        assert_eq!(info.eza_step, Some(4));
        assert!(info.is_seza);
        assert_eq!(
            info.original_release_date.as_deref(),
            Some("5/1/2020 2:00:00 AM PDT")
        );
        assert_eq!(
            info.eza_release_date.as_deref(),
            Some("9/20/2024 1:00:00 AM PDT")
        );
    }

    #[test]
    fn test_eza_without_step() {
        let html = r#"<div class="row"><span>PRE-EZA</span><span>EZA</span></div>"#;
        let info = eza_info(&Html::parse_document(html), "");
        assert!(info.has_eza);
        assert!(!info.is_seza);
        assert_eq!(info.eza_step, None);
    }

    #[test]
    fn test_domain_effects() {
        let html = r#"
            <div class="border border-phy">
              <div class="row"><b>Domain Effect(s)</b> <b>Time Chamber</b></div>
              <div class="row"><div class="col bg-phy-2">ATK +30% for all allies</div></div>
            </div>
            <div class="border border-phy">
              <div class="row"><b>Domain Effect(s)</b> <b>Time Chamber</b></div>
              <div class="row bg-phy-2">ATK +30% for all allies</div>
            </div>"#;
        let domains = domain_effects(&Html::parse_document(html));

        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].name.as_deref(), Some("Time Chamber"));
        assert_eq!(domains[0].effect.as_deref(), Some("ATK +30% for all allies"));
        assert_eq!(domains[0].card_type, Some(CardType::Phy));
    }

    #[test]
    fn test_categories_merged_and_cleaned() {
        let html = r#"
            <a href="/categories/1"><img alt="Fused Fighters" src="/x.png"></a>
            <a href="/categories/2"><img alt="background" src="/y.png"></a>
            <img src="/card_category/label/3.png" title="Potara">
            <img src="/card_category/label/4.png" alt="Fused Fighters">
            <img src="/card_category/label/5.png" alt="card_5.png">"#;
        let categories = categories(&Html::parse_document(html), &[]);
        assert_eq!(categories, vec!["Fused Fighters", "Potara"]);
    }

    #[test]
    fn test_categories_text_fallback() {
        let tree = Html::parse_document("<p>nothing</p>");
        let block = vec!["Super Saiyans".to_string(), "100%".to_string(), "Show More".to_string()];
        assert_eq!(categories(&tree, &block), vec!["Super Saiyans"]);
    }

    #[test]
    fn test_clean_categories() {
        let raw = vec![
            "• Realm of Gods".to_string(),
            "ICON".to_string(),
            "12 : 30".to_string(),
            "Stats".to_string(),
            "Realm of Gods".to_string(),
        ];
        assert_eq!(clean_categories(raw), vec!["Realm of Gods"]);
    }
}
