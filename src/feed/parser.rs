use crate::error::ErrorKind;
use crate::storage::{FeedMeta, PostDraft};
use feed_rs::parser;
use thiserror::Error;

/// The content could not be read as a feed.
#[derive(Debug, Error)]
#[error("Parse error: {0}")]
pub struct ParseError(String);

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ParseError
    }
}

/// Result of parsing one feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Channel metadata; present only when no `source_link` was given
    pub feed: Option<FeedMeta>,
    /// Entries in document order
    pub posts: Vec<PostDraft>,
    /// Entries dropped because they had no usable link
    pub skipped: usize,
}

/// Converts raw feed text into posts (and, on first registration, metadata).
///
/// `source_link` is the link of an already registered feed. When it is
/// `None` the caller is registering a new feed and `feed` is filled in.
pub trait FeedParser {
    fn parse(&self, raw: &str, source_link: Option<&str>) -> Result<ParsedFeed, ParseError>;
}

/// [`FeedParser`] for RSS 0.9x/1.0/2.0, Atom and JSON Feed via `feed-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedRsParser;

impl FeedParser for FeedRsParser {
    fn parse(&self, raw: &str, source_link: Option<&str>) -> Result<ParsedFeed, ParseError> {
        let feed = parser::parse(raw.as_bytes()).map_err(|e| ParseError(e.to_string()))?;

        let meta = source_link.is_none().then(|| FeedMeta {
            title: feed
                .title
                .map(|t| clean_text(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled Feed".to_owned()),
            description: feed
                .description
                .map(|d| clean_text(&d.content))
                .unwrap_or_default(),
        });

        let mut skipped = 0;
        let posts: Vec<PostDraft> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.trim().to_owned())
                    .filter(|href| !href.is_empty())
                    .or_else(|| {
                        // RSS permalink guids double as links
                        let id = entry.id.trim();
                        url::Url::parse(id).is_ok().then(|| id.to_owned())
                    });

                let Some(link) = link else {
                    skipped += 1;
                    return None;
                };

                let title = entry
                    .title
                    .map(|t| clean_text(&t.content))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Untitled".to_owned());
                let description = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .map(|d| clean_text(&d))
                    .unwrap_or_default();

                Some(PostDraft {
                    title,
                    link,
                    description,
                    published: entry.published.or(entry.updated),
                })
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(
                source = source_link.unwrap_or("<new feed>"),
                skipped,
                "Entries without a link skipped"
            );
        }

        Ok(ParsedFeed {
            feed: meta,
            posts,
            skipped,
        })
    }
}

/// Strips control characters (except tab/newline/CR) and surrounding whitespace
/// from feed-provided text.
fn clean_text(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <description>An example feed</description>
    <link>https://example.com</link>
    <item>
        <title>First</title>
        <link>https://example.com/1</link>
        <description>One</description>
        <pubDate>Mon, 02 Jan 2023 10:00:00 GMT</pubDate>
    </item>
    <item>
        <title>Second</title>
        <link>https://example.com/2</link>
        <description>Two</description>
    </item>
</channel></rss>"#;

    #[test]
    fn test_parse_new_feed_includes_metadata() {
        let parsed = FeedRsParser.parse(RSS, None).unwrap();
        let meta = parsed.feed.unwrap();
        assert_eq!(meta.title, "Example");
        assert_eq!(meta.description, "An example feed");

        let links: Vec<_> = parsed.posts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["https://example.com/1", "https://example.com/2"]);
        assert_eq!(parsed.posts[0].title, "First");
        assert_eq!(parsed.posts[0].description, "One");
        assert!(parsed.posts[0].published.is_some());
        assert!(parsed.posts[1].published.is_none());
    }

    #[test]
    fn test_parse_with_source_link_omits_metadata() {
        let parsed = FeedRsParser
            .parse(RSS, Some("https://example.com/feed.xml"))
            .unwrap();
        assert!(parsed.feed.is_none());
        assert_eq!(parsed.posts.len(), 2);
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom Example</title>
    <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
    <updated>2023-01-01T00:00:00Z</updated>
    <entry>
        <title>Entry</title>
        <link href="https://example.org/entry"/>
        <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
        <updated>2023-01-01T00:00:00Z</updated>
        <summary>Summary text</summary>
    </entry>
</feed>"#;
        let parsed = FeedRsParser.parse(atom, None).unwrap();
        assert_eq!(parsed.feed.unwrap().title, "Atom Example");
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].link, "https://example.org/entry");
        assert_eq!(parsed.posts[0].description, "Summary text");
    }

    #[test]
    fn test_guid_permalink_used_when_link_missing() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
    <item><title>A</title><guid>https://example.com/a</guid></item>
</channel></rss>"#;
        let parsed = FeedRsParser.parse(rss, None).unwrap();
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].link, "https://example.com/a");
    }

    #[test]
    fn test_entries_without_link_are_skipped() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
    <item><title>No link</title><guid isPermaLink="false">abc-123</guid></item>
    <item><title>Linked</title><link>https://example.com/x</link></item>
</channel></rss>"#;
        let parsed = FeedRsParser.parse(rss, None).unwrap();
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].title, "Linked");
    }

    #[test]
    fn test_missing_titles_get_placeholders() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><link>https://example.com/x</link></item>
</channel></rss>"#;
        let parsed = FeedRsParser.parse(rss, None).unwrap();
        assert_eq!(parsed.feed.unwrap().title, "Untitled Feed");
        assert_eq!(parsed.posts[0].title, "Untitled");
    }

    #[test]
    fn test_malformed_content_is_parse_error() {
        let err = FeedRsParser.parse("<not valid xml", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);

        let err = FeedRsParser
            .parse("<html><body>Hello</body></html>", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_empty_channel_has_no_posts() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        let parsed = FeedRsParser.parse(rss, Some("https://example.com/rss")).unwrap();
        assert!(parsed.posts.is_empty());
    }

    #[test]
    fn test_clean_text_strips_control_chars() {
        assert_eq!(clean_text("  Hi\u{1b}[31m there\u{7}  "), "Hi[31m there");
        assert_eq!(clean_text("line\nbreak"), "line\nbreak");
    }
}
