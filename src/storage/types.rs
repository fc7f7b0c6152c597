use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a registered feed. Assigned once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FeedId(pub u64);

/// Identifier of a post. Assigned once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Parser Output
// ============================================================================

/// Channel-level metadata extracted on first registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub description: String,
}

/// A post as parsed from a feed, before it has an id or an owning feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    /// Dedup key within the owning feed
    pub link: String,
    pub description: String,
    pub published: Option<DateTime<Utc>>,
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub id: FeedId,
    pub title: String,
    pub description: String,
    /// The submitted URL; unique across all feeds
    pub link: String,
}

/// A single entry owned by exactly one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub link: String,
    pub description: String,
    pub feed_id: FeedId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl Post {
    pub(crate) fn from_draft(id: PostId, feed_id: FeedId, draft: PostDraft) -> Self {
        Self {
            id,
            title: draft.title,
            link: draft.link,
            description: draft.description,
            feed_id,
            published: draft.published,
        }
    }
}

// ============================================================================
// Form / Loading / UI State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Filling,
    Valid,
    Invalid,
}

/// State of the subscription form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FormState {
    pub input_value: String,
    pub status: FormStatus,
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStatus {
    #[default]
    Idle,
    Sending,
    Success,
    Error,
}

/// State of the most recent submission's network round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoadingState {
    pub status: LoadingStatus,
    pub error: Option<ErrorKind>,
}

/// Presentation state owned by the renderer's interactions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UiState {
    pub modal_post_id: Option<PostId>,
    pub viewed_post_ids: BTreeSet<PostId>,
}

/// The whole state tree held by the [`Store`](super::Store).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AppState {
    pub form: FormState,
    pub loading: LoadingState,
    pub feeds: Vec<Feed>,
    /// Display order: most recently discovered first
    pub posts: Vec<Post>,
    pub ui: UiState,
}

impl AppState {
    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Posts belonging to one feed, in display order.
    pub fn posts_for_feed(&self, feed_id: FeedId) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(move |p| p.feed_id == feed_id)
    }
}

/// Names the subtree a mutation touched; passed to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatePath {
    Form,
    Loading,
    Posts,
    Ui,
    /// A feed together with its initial posts
    Subscription,
}
