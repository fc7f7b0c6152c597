//! RSS/Atom feed aggregator engine.
//!
//! Users submit feed URLs through [`app::Aggregator::submit`]; accepted feeds
//! are fetched, parsed and stored together with their posts. A
//! [`feed::Scheduler`] then re-fetches every registered feed on a fixed
//! cadence, merging only posts whose links the feed has not seen before.
//! All state lives in one [`storage::Store`] that notifies a single observer
//! after every change.

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod i18n;
pub mod ids;
pub mod render;
pub mod storage;
pub mod util;

pub use app::{Aggregator, SubmitError};
pub use error::ErrorKind;
