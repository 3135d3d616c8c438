//! List page probe
//!
//! A list page yields the detail-page candidates of its card grid and
//! whether a following page exists.

use crate::extract::sections::element_text;
use crate::extract::Document;
use crate::url::{card_id_from_href, page_number, resolve_href};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Card grid anchors on the catalog's list page
const GRID_SELECTOR: &str =
    r#"div.row.d-flex.flex-wrap.justify-content-center a.col-auto[href*="/cards/"]"#;

/// One card found on a list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCandidate {
    pub id: String,
    pub detail_url: String,
}

/// Everything extracted from one list page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Candidates in page order, de-duplicated by identifier
    pub candidates: Vec<ListCandidate>,
    pub has_next_page: bool,
}

/// Extracts detail candidates and the next-page flag from a list page
///
/// Anchors in the card grid are preferred; when the grid markup is absent,
/// any link to a card detail page counts.
pub fn extract_list(doc: &Document) -> ListPage {
    let tree = doc.tree();

    let mut candidates = grid_candidates(&tree, doc.url(), GRID_SELECTOR);
    if candidates.is_empty() {
        candidates = grid_candidates(&tree, doc.url(), r#"a[href*="/cards/"]"#);
    }

    ListPage {
        candidates,
        has_next_page: has_next_page(&tree, doc.url()),
    }
}

fn grid_candidates(tree: &Html, base: &Url, css: &str) -> Vec<ListCandidate> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for anchor in tree.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_href(base, href) else {
            continue;
        };
        let Some(id) = card_id_from_href(url.path()) else {
            continue;
        };
        if seen.insert(id.clone()) {
            candidates.push(ListCandidate {
                id,
                detail_url: url.to_string(),
            });
        }
    }

    candidates
}

/// A next page exists if a `rel="next"` link, an enabled pagination
/// "next" control, or a link to `page=<current+1>` is present
fn has_next_page(tree: &Html, base: &Url) -> bool {
    let current = page_number(base);

    if let Ok(rel_next) = Selector::parse(r#"a[rel~="next"][href], link[rel~="next"][href]"#) {
        if tree.select(&rel_next).next().is_some() {
            return true;
        }
    }

    if let Ok(pagination) = Selector::parse(".pagination li") {
        for item in tree.select(&pagination) {
            let disabled = item.value().classes().any(|c| c == "disabled");
            let label = element_text(item);
            if !disabled && matches!(label.as_str(), "Next" | "›" | "»" | ">") {
                return true;
            }
        }
    }

    let Ok(anchors) = Selector::parse("a[href]") else {
        return false;
    };
    tree.select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_href(base, href))
        .any(|url| {
            url.path() == base.path()
                && url.query_pairs().any(|(k, _)| k == "page")
                && page_number(&url) == current + 1
        })
}
