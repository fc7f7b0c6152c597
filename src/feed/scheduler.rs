//! The self-repeating refresh loop over every registered feed.
//!
//! Each cycle snapshots the registered feeds, refreshes all of them
//! concurrently (fetch → parse → dedupe → merge), and settles only once every
//! feed has either merged its new posts or failed. The next cycle starts a
//! fixed interval after the previous one settled. A failing feed is logged
//! and reported in the [`CycleReport`]; it never affects the other feeds or
//! stops the loop.
//!
//! Everything runs on one thread. Per-feed futures are joined inside the
//! calling task, so store mutations from different feeds interleave only at
//! `.await` points and each merge is applied in one step.

use super::fetcher::{FeedFetcher, FetchError};
use super::parser::{FeedParser, ParseError};
use crate::error::ErrorKind;
use crate::ids::IdGenerator;
use crate::storage::{Feed, FeedId, Post, SharedStore};
use futures::stream::{self, StreamExt};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Why a single feed could not be refreshed this cycle.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RefreshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RefreshError::Fetch(e) => e.kind(),
            RefreshError::Parse(e) => e.kind(),
        }
    }
}

/// Outcome of refreshing one feed in one cycle.
#[derive(Debug)]
pub struct FeedRefresh {
    pub feed_id: FeedId,
    pub link: String,
    /// Posts merged into the store, or the error that occurred
    pub result: Result<Vec<Post>, RefreshError>,
}

/// Everything that happened in one settled cycle.
///
/// Results are in completion order, not registration order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub results: Vec<FeedRefresh>,
}

impl CycleReport {
    /// Total posts merged across all feeds.
    pub fn new_posts(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .map(Vec::len)
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FeedRefresh> {
        self.results.iter().filter(|r| r.result.is_err())
    }

    pub fn result_for(&self, feed_id: FeedId) -> Option<&FeedRefresh> {
        self.results.iter().find(|r| r.feed_id == feed_id)
    }
}

/// Polling loop that keeps every registered feed up to date.
pub struct Scheduler {
    store: SharedStore,
    fetcher: Rc<dyn FeedFetcher>,
    parser: Rc<dyn FeedParser>,
    ids: Rc<dyn IdGenerator>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        store: SharedStore,
        fetcher: Rc<dyn FeedFetcher>,
        parser: Rc<dyn FeedParser>,
        ids: Rc<dyn IdGenerator>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            parser,
            ids,
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Requests the loop to stop.
    ///
    /// In-flight fetches are dropped and the inter-cycle wait is cut short.
    /// A merge that already started completes, since it never suspends.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Runs cycles until [`stop`](Self::stop) is called.
    ///
    /// Each settled cycle's report is sent on `report_tx` when given.
    ///
    /// # Returns
    ///
    /// The number of cycles that settled.
    pub async fn run(&self, report_tx: Option<mpsc::UnboundedSender<CycleReport>>) -> u64 {
        let mut cycles: u64 = 0;
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Polling scheduler started"
        );

        while !self.shutdown.is_cancelled() {
            let report = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                report = self.run_cycle() => report,
            };
            cycles += 1;

            tracing::debug!(
                cycle = cycles,
                feeds = report.results.len(),
                new_posts = report.new_posts(),
                failed = report.failures().count(),
                "Cycle settled"
            );

            if let Some(tx) = &report_tx {
                if tx.send(report).is_err() {
                    tracing::debug!("Cycle report receiver dropped");
                }
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(cycles, "Polling scheduler stopped");
        cycles
    }

    /// Refreshes every feed registered right now and waits for all of them.
    ///
    /// Fan-out equals the number of feeds; there is no concurrency cap.
    /// Feeds registered while the cycle runs are picked up by the next one.
    pub async fn run_cycle(&self) -> CycleReport {
        let feeds: Vec<Feed> = self.store.borrow().state().feeds.clone();
        if feeds.is_empty() {
            return CycleReport::default();
        }

        let fan_out = feeds.len();
        let results: Vec<FeedRefresh> = stream::iter(feeds)
            .map(|feed| self.refresh_feed(feed))
            .buffer_unordered(fan_out)
            .collect()
            .await;

        CycleReport { results }
    }

    async fn refresh_feed(&self, feed: Feed) -> FeedRefresh {
        let result = self.fetch_new_posts(&feed).await;

        match &result {
            Ok(posts) if !posts.is_empty() => {
                tracing::debug!(feed_id = %feed.id, new_posts = posts.len(), "Merged new posts");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    feed_id = %feed.id,
                    link = %feed.link,
                    kind = %e.kind(),
                    error = %e,
                    "Feed refresh failed"
                );
            }
        }

        FeedRefresh {
            feed_id: feed.id,
            link: feed.link,
            result,
        }
    }

    async fn fetch_new_posts(&self, feed: &Feed) -> Result<Vec<Post>, RefreshError> {
        let raw = self.fetcher.fetch(&feed.link).await?;
        let parsed = self.parser.parse(&raw, Some(&feed.link))?;

        // No suspension between dedupe and insert
        let merged = self
            .store
            .borrow_mut()
            .merge_posts(feed.id, parsed.posts, self.ids.as_ref());
        Ok(merged)
    }
}
