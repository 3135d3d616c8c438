//! Session controller: drives one crawl from index load to a terminal state
//!
//! A session:
//! - checks store integrity and loads the persistent index
//! - restores the frontier cursor, or seeds list page 1
//! - drains the frontier, fetching detail pages in small concurrent batches
//! - commits every extracted record through the single `Writer`
//! - pauses when the source blocks, and gives up after repeated blocks
//! - persists or clears the frontier cursor and records the run outcome
//!
//! Storage is touched only from the session task; fetch and extract run in
//! spawned tasks and hand their results back for commit in discovery order.

use crate::card::CardRecord;
use crate::config::CrawlerConfig;
use crate::crawler::assets::AssetStore;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::writer::{CommitOutcome, Writer};
use crate::extract::{extract_detail, extract_list, extract_related_ids};
use crate::state::{CardIndex, FrontierCursor, FrontierItem, SessionState};
use crate::storage::{Storage, StorageError};
use crate::url::CatalogUrls;
use crate::DokkanError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Progress is logged every this many commits
const PROGRESS_INTERVAL: u32 = 10;

/// The frontier is checkpointed every this many processed items
const CHECKPOINT_INTERVAL: u32 = 50;

/// Cooperative stop request shared with a signal handler
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Knobs of one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Cards inserted or updated before the session ends with `BudgetReached`
    pub max_new_items: u32,
    pub max_pages: u32,
    /// Detail pages fetched per batch
    pub concurrency: usize,
    /// Continue from the persisted frontier cursor
    pub resume: bool,
    /// Re-fetch cards already in the index
    pub forced_refresh: bool,
    /// First pause after the source blocks; doubled per consecutive block
    pub block_pause: Duration,
    /// Pauses allowed before the session stops
    pub max_block_pauses: u32,
    pub config_hash: String,
}

impl SessionOptions {
    /// Builds the options from the `[crawler]` config section
    pub fn from_config(crawler: &CrawlerConfig, config_hash: impl Into<String>) -> Self {
        Self {
            max_new_items: crawler.max_new_items,
            max_pages: crawler.max_pages,
            concurrency: crawler.concurrency.max(1) as usize,
            resume: crawler.resume,
            forced_refresh: crawler.forced_refresh,
            block_pause: crawler.block_pause(),
            max_block_pauses: crawler.max_block_pauses,
            config_hash: config_hash.into(),
        }
    }
}

/// The persisted state a session starts from
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub index: CardIndex,
    pub cursor: Option<FrontierCursor>,
}

impl SessionSnapshot {
    /// Checks store integrity and loads the index and frontier cursor
    ///
    /// # Returns
    ///
    /// * `Ok(SessionSnapshot)` - The store is consistent
    /// * `Err(DokkanError::IndexCorruption)` - The store failed its integrity
    ///   check or could not be read
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Result<Self, DokkanError> {
        let problems = storage.check_integrity().map_err(corruption)?;
        if !problems.is_empty() {
            return Err(DokkanError::IndexCorruption(problems.join("; ")));
        }

        let entries = storage.load_index().map_err(corruption)?;
        let cursor = storage.load_frontier().map_err(corruption)?;

        Ok(Self {
            index: CardIndex::from_entries(entries),
            cursor,
        })
    }
}

fn corruption(e: StorageError) -> DokkanError {
    DokkanError::IndexCorruption(e.to_string())
}

/// Summary of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub state: SessionState,
    pub run_id: Option<i64>,
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
    /// Known cards skipped when popped from a resumed frontier
    pub skipped: u32,
    /// Items given up on after a permanent fetch or extraction failure
    pub failed: u32,
    pub list_pages: u32,
    /// Items left in the frontier
    pub pending: usize,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            state: SessionState::Init,
            run_id: None,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            list_pages: 0,
            pending: 0,
        }
    }

    /// Items counted against the budget
    pub fn new_items(&self) -> u32 {
        self.inserted + self.updated
    }

    pub fn commits(&self) -> u32 {
        self.inserted + self.updated + self.unchanged
    }
}

/// The source pushed back during a step
#[derive(Debug, Default)]
struct Pushback {
    retry_after: Option<Duration>,
}

/// A detail page waiting to be fetched
struct DetailJob {
    id: String,
    url: String,
    origin_page: Option<u32>,
}

impl DetailJob {
    fn into_item(self) -> FrontierItem {
        FrontierItem::DetailPage {
            id: self.id,
            url: self.url,
            origin_page: self.origin_page,
        }
    }
}

type DetailResult = Result<(CardRecord, Vec<String>), DokkanError>;

/// One crawl session over a dataset
pub struct Session<S> {
    writer: Writer<S>,
    fetcher: Arc<dyn Fetcher>,
    urls: CatalogUrls,
    options: SessionOptions,
    stop: StopSignal,
    state: SessionState,
    frontier: Frontier,
    snapshot: Option<SessionSnapshot>,
    run_id: Option<i64>,
    report: SessionReport,
    processed: u32,
    last_checkpoint: u32,
    consecutive_blocks: u32,
    started: Instant,
}

impl<S: Storage> Session<S> {
    /// Creates a session; the index is loaded from `storage` when it runs
    ///
    /// # Arguments
    ///
    /// * `storage` - The dataset, owned by the session's writer
    /// * `fetcher` - Used for every list and detail page
    /// * `urls` - Builds list and detail URLs
    /// * `options` - Budget, concurrency and resume settings
    pub fn new(
        storage: S,
        fetcher: Arc<dyn Fetcher>,
        urls: CatalogUrls,
        options: SessionOptions,
    ) -> Self {
        Self {
            writer: Writer::new(storage, CardIndex::new()),
            fetcher,
            urls,
            options,
            stop: StopSignal::new(),
            state: SessionState::Init,
            frontier: Frontier::new(),
            snapshot: None,
            run_id: None,
            report: SessionReport::new(),
            processed: 0,
            last_checkpoint: 0,
            consecutive_blocks: 0,
            started: Instant::now(),
        }
    }

    /// Creates a session that starts from an already loaded snapshot
    pub fn from_snapshot(
        storage: S,
        snapshot: SessionSnapshot,
        fetcher: Arc<dyn Fetcher>,
        urls: CatalogUrls,
        options: SessionOptions,
    ) -> Self {
        let mut session = Self::new(storage, fetcher, urls, options);
        session.snapshot = Some(snapshot);
        session
    }

    pub fn with_asset_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.writer = self.writer.with_asset_store(store);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn index(&self) -> &CardIndex {
        self.writer.index()
    }

    pub fn storage(&self) -> &S {
        self.writer.storage()
    }

    pub fn into_storage(self) -> S {
        self.writer.into_storage()
    }

    /// Current index and pending frontier
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            index: self.writer.index().clone(),
            cursor: Some(self.frontier.current_cursor()),
        }
    }

    fn transition(&mut self, next: SessionState) -> Result<(), DokkanError> {
        if !self.state.can_transition_to(next) {
            return Err(DokkanError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Session {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Runs the session to a terminal state
    ///
    /// # Returns
    ///
    /// * `Ok(SessionReport)` - The session ended in `Done`, `BudgetReached` or `Stopped`
    /// * `Err(DokkanError)` - The session ended in `Fatal`; nothing further was written
    pub async fn run(&mut self) -> Result<SessionReport, DokkanError> {
        let outcome = match self.load() {
            Ok(()) => match self.drain().await {
                Ok(end) => self.finish(end),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => Ok(self.report()),
            Err(e) => {
                tracing::error!("Session failed: {}", e);
                if self.state.can_transition_to(SessionState::Fatal) {
                    self.state = SessionState::Fatal;
                }
                Err(e)
            }
        }
    }

    fn report(&self) -> SessionReport {
        SessionReport {
            state: self.state,
            run_id: self.run_id,
            pending: self.frontier.len(),
            ..self.report.clone()
        }
    }

    // ===== Load =====

    fn load(&mut self) -> Result<(), DokkanError> {
        self.transition(SessionState::LoadingIndex)?;

        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => SessionSnapshot::load(self.writer.storage())?,
        };
        tracing::info!("Loaded index with {} cards", snapshot.index.len());

        let resume = self.options.resume;
        self.frontier = match snapshot.cursor.filter(|c| resume && !c.is_empty()) {
            Some(cursor) => {
                tracing::info!(
                    "Resuming with {} pending items ({} detail pages)",
                    cursor.len(),
                    cursor.pending_details()
                );
                Frontier::from_cursor(cursor)
            }
            None => {
                tracing::info!("Starting from list page 1");
                let mut frontier = Frontier::new();
                frontier.seed([1]);
                frontier
            }
        };
        self.writer.replace_index(snapshot.index);

        let run_id = self
            .writer
            .storage_mut()
            .create_run(&self.options.config_hash)?;
        self.run_id = Some(run_id);
        self.started = Instant::now();
        tracing::info!("Starting crawl run {}", run_id);

        self.transition(SessionState::Running)
    }

    // ===== Drain =====

    async fn drain(&mut self) -> Result<SessionState, DokkanError> {
        loop {
            if self.stop.is_triggered() {
                tracing::info!("Stop requested");
                return Ok(SessionState::Stopped);
            }
            if self.report.new_items() >= self.options.max_new_items {
                tracing::info!("New-item budget of {} reached", self.options.max_new_items);
                return Ok(SessionState::BudgetReached);
            }

            let Some(item) = self.frontier.pop() else {
                tracing::info!("Frontier is empty, crawl complete");
                return Ok(SessionState::Done);
            };

            let pushback = match item {
                FrontierItem::ListPage { page } => self.process_list_page(page).await?,
                detail => {
                    let remaining = (self.options.max_new_items - self.report.new_items()) as usize;
                    let size = self.options.concurrency.min(remaining).max(1);
                    let mut batch = vec![detail];
                    batch.extend(self.frontier.pop_details(size - 1));
                    self.process_details(batch).await?
                }
            };

            match pushback {
                Some(pushback) => {
                    if !self.pause_after_block(pushback).await {
                        return Ok(SessionState::Stopped);
                    }
                }
                None => self.consecutive_blocks = 0,
            }

            if self.processed >= self.last_checkpoint + CHECKPOINT_INTERVAL {
                self.checkpoint()?;
            }
        }
    }

    async fn process_list_page(&mut self, page: u32) -> Result<Option<Pushback>, DokkanError> {
        let url = self.urls.list_page_url(page);
        tracing::debug!("Fetching list page {}", page);

        match self.fetcher.fetch(&url).await {
            Ok(doc) => {
                let listing = extract_list(&doc);
                let enqueued = self.frontier.enqueue_candidates(
                    &listing.candidates,
                    page,
                    self.writer.index(),
                    self.options.forced_refresh,
                );
                tracing::info!(
                    "List page {}: {} candidates, {} queued",
                    page,
                    listing.candidates.len(),
                    enqueued
                );

                if (enqueued > 0 || listing.has_next_page) && page < self.options.max_pages {
                    self.frontier.push(FrontierItem::ListPage { page: page + 1 });
                } else {
                    tracing::info!("Pagination ends at list page {}", page);
                }

                self.report.list_pages += 1;
                self.processed += 1;
                Ok(None)
            }
            Err(e) if e.is_blocked() => {
                self.frontier.requeue(FrontierItem::ListPage { page });
                Ok(Some(pushback_of(&e)))
            }
            Err(e) => {
                tracing::warn!("Giving up on list page {}: {}", page, e);
                self.report.failed += 1;
                self.processed += 1;
                Ok(None)
            }
        }
    }

    async fn process_details(
        &mut self,
        batch: Vec<FrontierItem>,
    ) -> Result<Option<Pushback>, DokkanError> {
        let mut jobs = Vec::with_capacity(batch.len());
        for item in batch {
            let (id, url, origin_page) = match item {
                FrontierItem::DetailPage {
                    id,
                    url,
                    origin_page,
                } => (id, url, origin_page),
                list @ FrontierItem::ListPage { .. } => {
                    self.frontier.requeue(list);
                    continue;
                }
            };
            // A resumed cursor may name cards committed since it was saved
            if !self.options.forced_refresh && self.writer.index().has(&id) {
                tracing::debug!("Card {} already indexed, skipping", id);
                self.report.skipped += 1;
                continue;
            }
            jobs.push(DetailJob {
                id,
                url,
                origin_page,
            });
        }

        let mut tasks = JoinSet::new();
        for (position, job) in jobs.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let id = job.id.clone();
            let url = job.url.clone();
            tasks.spawn(async move { (position, fetch_detail(fetcher, id, url).await) });
        }

        let mut results: Vec<Option<DetailResult>> = jobs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => results[position] = Some(result),
                Err(e) => tracing::warn!("Detail task failed: {}", e),
            }
        }

        let mut pushback = None;
        let mut blocked = Vec::new();

        for (job, result) in jobs.into_iter().zip(results) {
            match result {
                Some(Ok((record, related))) => {
                    let outcome = self.writer.commit(&record, job.origin_page).await?;
                    self.record_commit(&record, outcome);

                    let related: Vec<(String, String)> = related
                        .into_iter()
                        .map(|id| {
                            let url = self.urls.detail_url(&id);
                            (id, url)
                        })
                        .collect();
                    let queued = self.frontier.enqueue_related(
                        related,
                        self.writer.index(),
                        self.options.forced_refresh,
                    );
                    if queued > 0 {
                        tracing::debug!("Card {} linked {} unseen versions", record.id, queued);
                    }
                    self.processed += 1;
                }
                Some(Err(DokkanError::Fetch(e))) if e.is_blocked() => {
                    pushback = Some(pushback_of(&e));
                    blocked.push(job.into_item());
                }
                Some(Err(e)) => {
                    tracing::warn!("Skipping card {}: {}", job.id, e);
                    self.report.failed += 1;
                    self.processed += 1;
                }
                None => {
                    self.report.failed += 1;
                    self.processed += 1;
                }
            }
        }

        for item in blocked.into_iter().rev() {
            self.frontier.requeue(item);
        }

        Ok(pushback)
    }

    fn record_commit(&mut self, record: &CardRecord, outcome: CommitOutcome) {
        match outcome {
            CommitOutcome::Inserted => self.report.inserted += 1,
            CommitOutcome::Updated => self.report.updated += 1,
            CommitOutcome::Unchanged => self.report.unchanged += 1,
        }
        if outcome.is_new_item() {
            tracing::info!("Card {} ({}) {}", record.id, record.name, outcome);
        } else {
            tracing::debug!("Card {} ({}) {}", record.id, record.name, outcome);
        }

        let commits = self.report.commits();
        if commits % PROGRESS_INTERVAL == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                commits as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Progress: {} new of {} budget, {} unchanged, {} pending ({:.2} cards/sec)",
                self.report.new_items(),
                self.options.max_new_items,
                self.report.unchanged,
                self.frontier.len(),
                rate
            );
        }
    }

    /// Sleeps after a block; returns false once the pause allowance is spent
    async fn pause_after_block(&mut self, pushback: Pushback) -> bool {
        self.consecutive_blocks += 1;
        if self.consecutive_blocks > self.options.max_block_pauses {
            tracing::warn!(
                "Source still blocking after {} pauses, stopping",
                self.options.max_block_pauses
            );
            return false;
        }

        let exponent = (self.consecutive_blocks - 1).min(16);
        let backoff = self.options.block_pause.saturating_mul(1 << exponent);
        let pause = pushback
            .retry_after
            .map_or(backoff, |retry_after| retry_after.max(backoff));

        tracing::warn!(
            "Source is blocking requests, pausing for {:?} ({}/{})",
            pause,
            self.consecutive_blocks,
            self.options.max_block_pauses
        );
        tokio::time::sleep(pause).await;
        true
    }

    fn checkpoint(&mut self) -> Result<(), DokkanError> {
        let cursor = self.frontier.current_cursor();
        self.writer.storage_mut().save_frontier(&cursor)?;
        self.last_checkpoint = self.processed;
        tracing::debug!("Checkpointed frontier with {} items", cursor.len());
        Ok(())
    }

    // ===== Finish =====

    fn finish(&mut self, end: SessionState) -> Result<(), DokkanError> {
        let cursor = self.frontier.current_cursor();
        let new_items = self.report.new_items();
        let storage = self.writer.storage_mut();

        if end.is_resumable() {
            storage.save_frontier(&cursor)?;
        } else {
            storage.clear_frontier()?;
        }
        if let Some(run_id) = self.run_id {
            storage.finish_run(run_id, end, new_items)?;
        }

        self.transition(end)?;

        tracing::info!(
            "Session {}: {} inserted, {} updated, {} unchanged, {} failed, {} pending",
            end,
            self.report.inserted,
            self.report.updated,
            self.report.unchanged,
            self.report.failed,
            cursor.len()
        );
        Ok(())
    }
}

fn pushback_of(error: &FetchError) -> Pushback {
    match error {
        FetchError::Blocked { retry_after, .. } => Pushback {
            retry_after: *retry_after,
        },
        _ => Pushback::default(),
    }
}

/// Fetches one detail page and extracts its record and related card ids
async fn fetch_detail(fetcher: Arc<dyn Fetcher>, id: String, url: String) -> DetailResult {
    let doc = fetcher.fetch(&url).await?;
    let record = extract_detail(&doc, &id)?;
    let related = extract_related_ids(&doc)
        .into_iter()
        .filter(|related| *related != id)
        .collect();
    Ok((record, related))
}
