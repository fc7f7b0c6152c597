//! Error taxonomy shared by the validator, the submission flow and the
//! background refresh loop.
//!
//! Every layer has its own `thiserror` enum (see `util::url_validator`,
//! `feed::fetcher`, `feed::parser`) and each of them collapses into one
//! [`ErrorKind`] token. The core never produces display text: the token is
//! handed to an [`i18n::Localizer`](crate::i18n::Localizer) by whoever renders
//! it.

use serde::Serialize;
use std::fmt;

/// Locale-independent error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The submitted string was empty or whitespace-only.
    EmptyInput,
    /// The submitted string is not an absolute http(s) URL.
    InvalidUrl,
    /// The URL is already registered as a feed.
    DuplicateFeed,
    /// Transport failure, non-2xx status or unreadable response.
    NetworkError,
    /// The response was not a recognisable RSS/Atom document.
    ParseError,
}

impl ErrorKind {
    /// All kinds, in taxonomy order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::EmptyInput,
        ErrorKind::InvalidUrl,
        ErrorKind::DuplicateFeed,
        ErrorKind::NetworkError,
        ErrorKind::ParseError,
    ];

    /// Stable translation key for this kind.
    pub fn key(self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "errors.empty",
            ErrorKind::InvalidUrl => "errors.url",
            ErrorKind::DuplicateFeed => "errors.alreadyOnTheList",
            ErrorKind::NetworkError => "errors.network",
            ErrorKind::ParseError => "errors.parse",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
