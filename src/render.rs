//! Line-oriented renderer used by the binary as the store observer.
//!
//! Prints each feed and post once, the first time it shows up in state, plus
//! localized submission errors. Output is plain text or one JSON object per
//! line.

use crate::error::ErrorKind;
use crate::i18n::{Localizer, Messages};
use crate::storage::{AppState, Feed, FeedId, FormStatus, LoadingStatus, Post, PostId, StatePath};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Feed { feed: &'a Feed },
    Post { post: &'a Post },
    Loaded { message: &'a str },
    Error { kind: ErrorKind, message: String },
}

pub struct TerminalRenderer<W: Write> {
    out: W,
    messages: Messages,
    format: OutputFormat,
    printed_feeds: HashSet<FeedId>,
    printed_posts: HashSet<PostId>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, messages: Messages, format: OutputFormat) -> Self {
        Self {
            out,
            messages,
            format,
            printed_feeds: HashSet::new(),
            printed_posts: HashSet::new(),
        }
    }

    /// Renders whatever changed under `path`.
    pub fn render(&mut self, path: StatePath, state: &AppState) -> io::Result<()> {
        match path {
            StatePath::Form => {
                if state.form.status == FormStatus::Invalid {
                    if let Some(kind) = state.form.error {
                        let message = self.messages.translate(kind);
                        self.emit(&Event::Error { kind, message })?;
                    }
                }
            }
            StatePath::Loading => {
                if state.loading.status == LoadingStatus::Success {
                    let message = self.messages.success();
                    self.emit(&Event::Loaded { message })?;
                }
            }
            StatePath::Posts | StatePath::Subscription => {
                for feed in &state.feeds {
                    if self.printed_feeds.insert(feed.id) {
                        self.emit(&Event::Feed { feed })?;
                    }
                }
                // Oldest of the unseen first, so the newest ends up at the bottom
                for post in state.posts.iter().rev() {
                    if self.printed_posts.insert(post.id) {
                        self.emit(&Event::Post { post })?;
                    }
                }
            }
            StatePath::Ui => {}
        }
        self.out.flush()
    }

    fn emit(&mut self, event: &Event<'_>) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, event)?;
                writeln!(self.out)
            }
            OutputFormat::Text => match event {
                Event::Feed { feed } => writeln!(self.out, "# {} <{}>", feed.title, feed.link),
                Event::Post { post } => match post.published {
                    Some(at) => writeln!(
                        self.out,
                        "[{}] {} - {}",
                        at.format("%Y-%m-%d %H:%M"),
                        post.title,
                        post.link
                    ),
                    None => writeln!(self.out, "{} - {}", post.title, post.link),
                },
                Event::Loaded { message } => writeln!(self.out, "{message}"),
                Event::Error { message, .. } => writeln!(self.out, "error: {message}"),
            },
        }
    }
}
