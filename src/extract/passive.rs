//! Structured passive skill probe
//!
//! The passive panel is a row holding a bold "Passive Skill" label and the
//! skill name, followed by a coloured (`bg-*`) row whose body lists
//! `<strong>` condition headers, each followed by `<li>` effects.

use crate::card::PassiveSection;
use crate::extract::sections::{condense, element_text, Section};
use scraper::{ElementRef, Html, Selector};

/// Condition used for effects listed before any condition header
const BASIC_CONDITION: &str = "Basic effect(s)";

/// Result of the structured probe
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct StructuredPassive {
    pub name: Option<String>,
    pub sections: Vec<PassiveSection>,
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Reads the passive panel from the DOM
///
/// Returns an empty result when the panel is missing; a name without
/// sections means the panel exists but its body is not structured.
pub(crate) fn structured_passive(tree: &Html) -> StructuredPassive {
    let Ok(bold) = Selector::parse("b") else {
        return StructuredPassive::default();
    };
    let Some(label) = tree
        .select(&bold)
        .find(|b| element_text(*b) == "Passive Skill")
    else {
        return StructuredPassive::default();
    };

    let Some(passive_row) = label
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && has_class(*el, "row"))
    else {
        return StructuredPassive::default();
    };

    let name = passive_name(passive_row);

    let content_row = passive_row
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "div")
        .find(|el| el.value().classes().any(|c| c.contains("bg-")));

    let sections = content_row
        .and_then(content_column)
        .map(parse_sections)
        .unwrap_or_default();

    StructuredPassive { name, sections }
}

fn passive_name(passive_row: ElementRef<'_>) -> Option<String> {
    let name_col = Selector::parse("div.col-sm-8").ok()?;
    let bold = Selector::parse("b").ok()?;

    let column = passive_row.select(&name_col).next()?;
    let name = match column.select(&bold).next() {
        Some(b) => element_text(b),
        None => element_text(column),
    };
    (!name.is_empty()).then_some(name)
}

fn content_column(content_row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let exact = Selector::parse("div.col").ok()?;
    if let Some(column) = content_row.select(&exact).next() {
        return Some(column);
    }
    let loose = Selector::parse(r#"div[class*="col"]"#).ok()?;
    content_row.select(&loose).next()
}

fn parse_sections(column: ElementRef<'_>) -> Vec<PassiveSection> {
    let mut sections: Vec<PassiveSection> = Vec::new();

    for element in column.descendants().filter_map(ElementRef::wrap) {
        match element.value().name() {
            "strong" => {
                let condition = element_text(element);
                if !condition.is_empty() && !Section::is_header(&condition) {
                    sections.push(PassiveSection {
                        condition,
                        effects: Vec::new(),
                    });
                }
            }
            "li" => {
                let effect = effect_text(element);
                if effect.is_empty() {
                    continue;
                }
                if sections.is_empty() {
                    sections.push(PassiveSection {
                        condition: BASIC_CONDITION.to_string(),
                        effects: Vec::new(),
                    });
                }
                if let Some(current) = sections.last_mut() {
                    if !current.effects.contains(&effect) {
                        current.effects.push(effect);
                    }
                }
            }
            _ => {}
        }
    }

    sections.retain(|s| !s.effects.is_empty());
    sections
}

/// Text of one effect bullet; arrow icons become ↑ / ↓
fn effect_text(li: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    for node in li.descendants() {
        if let Some(text) = node.value().as_text() {
            parts.push(text.to_string());
        } else if let Some(el) = node.value().as_element() {
            if el.name() != "img" {
                continue;
            }
            let alt = el.attr("alt").unwrap_or_default().to_lowercase();
            if alt.contains("arrow") {
                let arrow = if alt.contains("down") { "↓" } else { "↑" };
                parts.push(arrow.to_string());
            }
        }
    }

    condense(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: &str = r#"
        <div class="container">
          <div class="row">
            <div class="col-sm-4"><b>Passive Skill</b></div>
            <div class="col-sm-8"><b>Saiyan Pride</b></div>
          </div>
          <div class="row spacer"></div>
          <div class="row bg-str-2">
            <div class="col">
              <ul><li>ATK &amp; DEF +200%</li></ul>
              <strong>Basic effect(s)</strong>
              <ul><li>Ki +3</li><li>Ki +3</li></ul>
              <strong>When HP is 50% or more</strong>
              <ul><li>DEF <img alt="up green arrow" src="/a.png"></li></ul>
              <strong>Empty condition</strong>
            </div>
          </div>
        </div>"#;

    #[test]
    fn test_structured_panel() {
        let tree = Html::parse_document(PANEL);
        let passive = structured_passive(&tree);

        assert_eq!(passive.name.as_deref(), Some("Saiyan Pride"));
        assert_eq!(passive.sections.len(), 3);

        // Effects before any header get the basic condition
        assert_eq!(passive.sections[0].condition, BASIC_CONDITION);
        assert_eq!(passive.sections[0].effects, vec!["ATK & DEF +200%"]);

        assert_eq!(passive.sections[1].effects, vec!["Ki +3"]);
        assert_eq!(passive.sections[2].condition, "When HP is 50% or more");
        assert_eq!(passive.sections[2].effects, vec!["DEF ↑"]);
    }

    #[test]
    fn test_missing_panel() {
        let tree = Html::parse_document("<div class='row'><b>Leader Skill</b></div>");
        assert_eq!(structured_passive(&tree), StructuredPassive::default());
    }

    #[test]
    fn test_panel_without_body() {
        let tree = Html::parse_document(
            r#"<div class="row"><div class="col-sm-4"><b>Passive Skill</b></div>
               <div class="col-sm-8">Unyielding Will</div></div>"#,
        );
        let passive = structured_passive(&tree);
        assert_eq!(passive.name.as_deref(), Some("Unyielding Will"));
        assert!(passive.sections.is_empty());
    }
}
