//! The single mutable state tree and its change notification.
//!
//! Every change goes through [`Store::mutate`], which applies the update and
//! then synchronously hands the observer the changed path plus the full
//! state. Composite changes that must never be observed half-done (a feed
//! and its initial posts) are performed inside one `mutate` call.
//!
//! The engine is single-threaded: the store is shared as
//! `Rc<RefCell<Store>>` and no borrow is ever held across an `.await`.
//! Observers receive `&AppState` while the store is borrowed, so they must
//! not call back into the store.

use super::types::{AppState, Feed, FeedId, FeedMeta, Post, PostDraft, PostId, StatePath};
use crate::feed::dedupe;
use crate::ids::IdGenerator;
use crate::util::feed_key;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

/// Callback invoked after every mutation.
pub type Observer = Box<dyn FnMut(StatePath, &AppState)>;

/// Handle shared by the submission flow and the scheduler.
pub type SharedStore = Rc<RefCell<Store>>;

/// A feed with this link already exists.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Feed already registered: {0}")]
pub struct DuplicateFeed(pub String);

/// The referenced post does not exist.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown post: {0}")]
pub struct UnknownPost(pub PostId);

#[derive(Default)]
pub struct Store {
    state: AppState,
    observer: Option<Observer>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("observer", &self.observer.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the store for sharing between the submission flow and the scheduler.
    pub fn into_shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Registers the observer, replacing any previous one.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(StatePath, &AppState) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Applies `update` to the state and then notifies the observer with `path`.
    pub fn mutate<R>(&mut self, path: StatePath, update: impl FnOnce(&mut AppState) -> R) -> R {
        let out = update(&mut self.state);
        if let Some(observer) = self.observer.as_mut() {
            observer(path, &self.state);
        }
        out
    }

    /// Links of every registered feed.
    pub fn feed_links(&self) -> HashSet<String> {
        self.state.feeds.iter().map(|f| f.link.clone()).collect()
    }

    /// Links of the posts already stored for `feed_id`.
    pub fn known_links(&self, feed_id: FeedId) -> HashSet<&str> {
        self.state
            .posts_for_feed(feed_id)
            .map(|p| p.link.as_str())
            .collect()
    }

    /// Adds a feed and its initial posts as one observable change.
    ///
    /// Repeated links inside `drafts` are collapsed. Posts are placed ahead of
    /// every existing post, in parse order.
    ///
    /// # Errors
    ///
    /// [`DuplicateFeed`] if a feed with the same [`feed_key`] is already present.
    /// Validation checks this before the fetch, but a concurrent submission of
    /// the same URL can land in between.
    pub fn register_feed(
        &mut self,
        link: String,
        meta: FeedMeta,
        drafts: Vec<PostDraft>,
        ids: &dyn IdGenerator,
    ) -> Result<(Feed, Vec<Post>), DuplicateFeed> {
        let key = feed_key(&link);
        if self.state.feeds.iter().any(|f| feed_key(&f.link) == key) {
            return Err(DuplicateFeed(link));
        }

        let feed = Feed {
            id: FeedId(ids.next_id()),
            title: meta.title,
            description: meta.description,
            link,
        };
        let posts = mint_posts(feed.id, dedupe(drafts, &HashSet::new()), ids);

        tracing::debug!(
            feed_id = %feed.id,
            link = %feed.link,
            posts = posts.len(),
            "Registering feed"
        );

        let (feed_out, posts_out) = (feed.clone(), posts.clone());
        self.mutate(StatePath::Subscription, move |state| {
            state.feeds.push(feed);
            state.posts.splice(0..0, posts);
        });

        Ok((feed_out, posts_out))
    }

    /// Prepends the posts of `drafts` not yet known for `feed_id`.
    ///
    /// Dedupe happens here, against the state at the moment of the merge.
    /// Nothing is mutated and the observer is not called when no post is new.
    pub fn merge_posts(
        &mut self,
        feed_id: FeedId,
        drafts: Vec<PostDraft>,
        ids: &dyn IdGenerator,
    ) -> Vec<Post> {
        let fresh = dedupe(drafts, &self.known_links(feed_id));
        if fresh.is_empty() {
            return Vec::new();
        }

        let posts = mint_posts(feed_id, fresh, ids);
        let merged = posts.clone();
        self.mutate(StatePath::Posts, move |state| {
            state.posts.splice(0..0, posts);
        });

        merged
    }

    /// Opens a post in the preview modal and marks it viewed.
    pub fn open_post(&mut self, post_id: PostId) -> Result<(), UnknownPost> {
        if self.state.post(post_id).is_none() {
            return Err(UnknownPost(post_id));
        }
        self.mutate(StatePath::Ui, |state| {
            state.ui.modal_post_id = Some(post_id);
            state.ui.viewed_post_ids.insert(post_id);
        });
        Ok(())
    }

    /// Closes the preview modal. Viewed marks stay.
    pub fn close_post(&mut self) {
        self.mutate(StatePath::Ui, |state| state.ui.modal_post_id = None);
    }
}

fn mint_posts(feed_id: FeedId, drafts: Vec<PostDraft>, ids: &dyn IdGenerator) -> Vec<Post> {
    drafts
        .into_iter()
        .map(|draft| Post::from_draft(PostId(ids.next_id()), feed_id, draft))
        .collect()
}
