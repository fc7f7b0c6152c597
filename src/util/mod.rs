//! Utility functions shared across the engine.
//!
//! - **URL validation**: format and uniqueness checks for submitted feed URLs,
//!   plus the canonical key feed links are compared by
//!
//! # Examples
//!
//! ```
//! use rss_aggregator::util::validate_url;
//! use std::collections::HashSet;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let link = rt.block_on(validate_url("https://example.com/feed.xml", &HashSet::new()));
//! assert_eq!(link.unwrap(), "https://example.com/feed.xml");
//! ```

mod url_validator;

pub use url_validator::{feed_key, validate_url, ValidationError};
