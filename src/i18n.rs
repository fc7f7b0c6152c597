//! Mapping from [`ErrorKind`] tokens to display strings.
//!
//! The engine only ever stores tokens in state; renderers translate them at
//! the edge through a [`Localizer`].

use crate::error::ErrorKind;
use std::str::FromStr;
use thiserror::Error;

/// Translates an error token into text for the active locale.
pub trait Localizer {
    fn translate(&self, kind: ErrorKind) -> String;
}

#[derive(Debug, Error)]
#[error("Unsupported locale: {0} (expected \"en\" or \"ru\")")]
pub struct UnknownLocale(String);

/// Locales with a built-in message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ru" => Ok(Locale::Ru),
            other => Err(UnknownLocale(other.to_owned())),
        }
    }
}

/// Built-in message table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Message shown after a feed was registered.
    pub fn success(&self) -> &'static str {
        match self.locale {
            Locale::En => "RSS feed loaded successfully",
            Locale::Ru => "RSS успешно загружен",
        }
    }
}

impl Localizer for Messages {
    fn translate(&self, kind: ErrorKind) -> String {
        let text = match (self.locale, kind) {
            (Locale::En, ErrorKind::EmptyInput) => "The field must not be empty",
            (Locale::En, ErrorKind::InvalidUrl) => "The link must be a valid URL",
            (Locale::En, ErrorKind::DuplicateFeed) => "RSS feed already exists",
            (Locale::En, ErrorKind::NetworkError) => "Network error",
            (Locale::En, ErrorKind::ParseError) => "The resource does not contain a valid RSS feed",
            (Locale::Ru, ErrorKind::EmptyInput) => "Не должно быть пустым",
            (Locale::Ru, ErrorKind::InvalidUrl) => "Ссылка должна быть валидным URL",
            (Locale::Ru, ErrorKind::DuplicateFeed) => "RSS уже существует",
            (Locale::Ru, ErrorKind::NetworkError) => "Ошибка сети",
            (Locale::Ru, ErrorKind::ParseError) => "Ресурс не содержит валидный RSS",
        };
        text.to_owned()
    }
}
