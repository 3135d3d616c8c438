//! Frontier of pending work
//!
//! Detail pages are always popped before the next list page, so pagination
//! interleaves with detail processing: a list page enqueues its candidates,
//! they drain, and only then does the next list page come up. List pages
//! are popped in ascending page order.

use crate::extract::ListCandidate;
use crate::state::{CardIndex, FrontierCursor, FrontierItem};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// In-memory frontier, restorable from a `FrontierCursor`
#[derive(Debug, Default)]
pub struct Frontier {
    /// Pending list pages, lowest first
    list_pages: BTreeSet<u32>,

    /// Pending detail pages in discovery order
    details: VecDeque<FrontierItem>,

    /// Identifiers ever queued this session
    queued_ids: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the frontier with list pages
    pub fn seed(&mut self, pages: impl IntoIterator<Item = u32>) {
        self.list_pages.extend(pages);
    }

    /// Pops the next item: a detail page if any is pending, else the lowest list page
    pub fn pop(&mut self) -> Option<FrontierItem> {
        if let Some(detail) = self.details.pop_front() {
            return Some(detail);
        }
        self.list_pages
            .pop_first()
            .map(|page| FrontierItem::ListPage { page })
    }

    /// Pops up to `limit` detail pages, in order
    pub fn pop_details(&mut self, limit: usize) -> Vec<FrontierItem> {
        let take = limit.min(self.details.len());
        self.details.drain(..take).collect()
    }

    /// Adds an item
    ///
    /// # Returns
    ///
    /// `false` if the item was already queued this session
    pub fn push(&mut self, item: FrontierItem) -> bool {
        match item {
            FrontierItem::ListPage { page } => self.list_pages.insert(page),
            FrontierItem::DetailPage { ref id, .. } => {
                if !self.queued_ids.insert(id.clone()) {
                    return false;
                }
                self.details.push_back(item);
                true
            }
        }
    }

    /// Puts an item back at the front, bypassing de-duplication
    ///
    /// Used when the source blocks us and the item must be retried.
    pub fn requeue(&mut self, item: FrontierItem) {
        match item {
            FrontierItem::ListPage { page } => {
                self.list_pages.insert(page);
            }
            detail @ FrontierItem::DetailPage { .. } => self.details.push_front(detail),
        }
    }

    /// Enqueues the candidates of one list page
    ///
    /// Candidates already in the index are skipped unless `forced` is set.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Candidates in page order
    /// * `origin_page` - The list page they were found on
    /// * `index` - The persistent index
    /// * `forced` - Re-fetch known identifiers too
    ///
    /// # Returns
    ///
    /// The number of candidates that were enqueued
    pub fn enqueue_candidates(
        &mut self,
        candidates: &[ListCandidate],
        origin_page: u32,
        index: &CardIndex,
        forced: bool,
    ) -> usize {
        candidates
            .iter()
            .filter(|c| forced || !index.has(&c.id))
            .filter(|c| {
                self.push(FrontierItem::DetailPage {
                    id: c.id.clone(),
                    url: c.detail_url.clone(),
                    origin_page: Some(origin_page),
                })
            })
            .count()
    }

    /// Enqueues related cards found on a detail page, under the same skip rule
    ///
    /// Related cards carry no origin page.
    pub fn enqueue_related(
        &mut self,
        related: impl IntoIterator<Item = (String, String)>,
        index: &CardIndex,
        forced: bool,
    ) -> usize {
        related
            .into_iter()
            .filter(|(id, _)| forced || !index.has(id))
            .filter(|(id, url)| {
                self.push(FrontierItem::DetailPage {
                    id: id.clone(),
                    url: url.clone(),
                    origin_page: None,
                })
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty() && self.list_pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.details.len() + self.list_pages.len()
    }

    /// Snapshot of the pending work in pop order
    pub fn current_cursor(&self) -> FrontierCursor {
        let details = self.details.iter().cloned();
        let lists = self
            .list_pages
            .iter()
            .map(|&page| FrontierItem::ListPage { page });
        FrontierCursor::new(details.chain(lists).collect())
    }

    /// Rebuilds a frontier from a persisted cursor
    pub fn from_cursor(cursor: FrontierCursor) -> Self {
        let mut frontier = Self::new();
        for item in cursor.items {
            frontier.push(item);
        }
        frontier
    }
}
