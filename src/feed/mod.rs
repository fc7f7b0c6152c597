//! Feed ingestion: fetching, parsing, deduplication and periodic refresh.
//!
//! - `fetcher` - the [`FeedFetcher`] seam and its `reqwest` implementation
//! - `parser` - the [`FeedParser`] seam and its `feed-rs` implementation
//! - `dedupe` - filtering parsed posts against the links a feed already has
//! - `scheduler` - the polling loop that refreshes every feed on a fixed cadence
//!
//! # Example
//!
//! ```ignore
//! use rss_aggregator::feed::Scheduler;
//!
//! let scheduler = aggregator.scheduler(Duration::from_secs(5));
//! let report = scheduler.run_cycle().await;
//! println!("{} new posts", report.new_posts());
//! ```

mod dedupe;
mod fetcher;
mod parser;
mod scheduler;

pub use dedupe::dedupe;
pub use fetcher::{
    ClientBuildError, FeedFetcher, FetchError, HttpFetcher, DEFAULT_MAX_FEED_SIZE, DEFAULT_TIMEOUT,
};
pub use parser::{FeedParser, FeedRsParser, ParseError, ParsedFeed};
pub use scheduler::{CycleReport, FeedRefresh, RefreshError, Scheduler, DEFAULT_INTERVAL};
