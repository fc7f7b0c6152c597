use crate::error::ErrorKind;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Reasons a candidate feed URL is rejected.
///
/// Checked in declaration order; the first failing rule wins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing but whitespace was submitted.
    #[error("URL must not be empty")]
    EmptyInput,
    /// The string is not an absolute http(s) URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// A feed with this link is already registered.
    #[error("Feed already registered: {0}")]
    DuplicateFeed(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::EmptyInput => ErrorKind::EmptyInput,
            ValidationError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ValidationError::DuplicateFeed(_) => ErrorKind::DuplicateFeed,
        }
    }
}

/// Validates a feed URL submitted by the user against the registered links.
///
/// The candidate is trimmed before checking. Rules, first failure wins:
///
/// 1. empty or whitespace-only → [`ValidationError::EmptyInput`]
/// 2. not an absolute `http`/`https` URL with a host → [`ValidationError::InvalidUrl`]
/// 3. already present in `existing_links` → [`ValidationError::DuplicateFeed`]
///
/// The duplicate check compares [`feed_key`]s, so `https://example.com` and
/// `https://EXAMPLE.com/` collide whichever of them was registered first.
///
/// Asynchronous so a remote check can be added without changing callers.
///
/// # Returns
///
/// The trimmed link, which is what gets stored as the feed's `link`.
///
/// # Examples
///
/// ```
/// use rss_aggregator::util::{validate_url, ValidationError};
/// use std::collections::HashSet;
///
/// # tokio_test_block_on(async {
/// let existing = HashSet::from(["https://example.com/feed.xml".to_string()]);
///
/// assert!(validate_url("https://example.org/rss", &existing).await.is_ok());
/// assert_eq!(validate_url("   ", &existing).await, Err(ValidationError::EmptyInput));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn validate_url(
    candidate: &str,
    existing_links: &HashSet<String>,
) -> Result<String, ValidationError> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let url = parse_feed_url(trimmed)?;

    let key = url.as_str();
    if existing_links.iter().any(|link| feed_key(link) == key) {
        return Err(ValidationError::DuplicateFeed(trimmed.to_owned()));
    }

    Ok(trimmed.to_owned())
}

/// Canonical form two feed links are compared by.
///
/// The `url::Url` serialization (lowercased scheme and host, root path
/// filled in) when the link parses, the trimmed text otherwise.
pub fn feed_key(link: &str) -> String {
    let trimmed = link.trim();
    match Url::parse(trimmed) {
        Ok(url) => url.as_str().to_owned(),
        Err(_) => trimmed.to_owned(),
    }
}

fn parse_feed_url(s: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(s).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ValidationError::InvalidUrl(format!(
                "unsupported scheme: {scheme}"
            )))
        }
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ValidationError::InvalidUrl("missing host".to_owned())),
    }
}
