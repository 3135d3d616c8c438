/// Frontier work items and the serializable cursor
///
/// The cursor is what survives between runs: the ordered list of pending
/// work at the moment a session ended or checkpointed.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of pending work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrontierItem {
    /// A page of the card listing
    ListPage { page: u32 },

    /// A card detail page
    DetailPage {
        id: String,
        url: String,
        /// List page the card was discovered on; `None` for related cards
        origin_page: Option<u32>,
    },
}

impl FrontierItem {
    /// Returns the storage tag for this kind of item
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListPage { .. } => "list_page",
            Self::DetailPage { .. } => "detail_page",
        }
    }

    pub fn is_detail(&self) -> bool {
        matches!(self, Self::DetailPage { .. })
    }
}

impl fmt::Display for FrontierItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListPage { page } => write!(f, "list page {}", page),
            Self::DetailPage { id, .. } => write!(f, "card {}", id),
        }
    }
}

/// Serializable snapshot of the frontier, in pop order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierCursor {
    pub items: Vec<FrontierItem>,
}

impl FrontierCursor {
    pub fn new(items: Vec<FrontierItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Number of pending detail pages
    pub fn pending_details(&self) -> usize {
        self.items.iter().filter(|i| i.is_detail()).count()
    }
}
