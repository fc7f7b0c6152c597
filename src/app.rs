//! Submission flow and wiring of the engine's collaborators.
//!
//! [`Aggregator`] owns the shared [`Store`] together with the fetch, parse and
//! id collaborators. It drives the form/loading state machine for a user
//! submission and hands the same collaborators to the polling
//! [`Scheduler`].

use crate::config::Config;
use crate::error::ErrorKind;
use crate::feed::{
    ClientBuildError, FeedFetcher, FeedParser, FeedRsParser, FetchError, HttpFetcher, ParseError,
    Scheduler,
};
use crate::ids::{IdGenerator, SequentialIds};
use crate::storage::{
    AppState, DuplicateFeed, Feed, FeedMeta, FormStatus, LoadingStatus, PostId, SharedStore,
    StatePath, Store, UnknownPost,
};
use crate::util::{validate_url, ValidationError};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Why a submission did not register a feed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::Validation(e) => e.kind(),
            SubmitError::Fetch(e) => e.kind(),
            SubmitError::Parse(e) => e.kind(),
        }
    }
}

impl From<DuplicateFeed> for SubmitError {
    fn from(DuplicateFeed(link): DuplicateFeed) -> Self {
        SubmitError::Validation(ValidationError::DuplicateFeed(link))
    }
}

/// The feed aggregator: shared state plus the collaborators that fill it.
pub struct Aggregator {
    store: SharedStore,
    fetcher: Rc<dyn FeedFetcher>,
    parser: Rc<dyn FeedParser>,
    ids: Rc<dyn IdGenerator>,
}

impl Aggregator {
    pub fn new(
        fetcher: Rc<dyn FeedFetcher>,
        parser: Rc<dyn FeedParser>,
        ids: Rc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store: Store::new().into_shared(),
            fetcher,
            parser,
            ids,
        }
    }

    /// Builds the production wiring: `reqwest` fetcher, `feed-rs` parser and
    /// sequential ids.
    pub fn from_config(config: &Config) -> Result<Self, ClientBuildError> {
        let fetcher = HttpFetcher::with_user_agent(&config.user_agent)?
            .timeout(config.request_timeout())
            .max_bytes(config.max_feed_bytes);

        Ok(Self::new(
            Rc::new(fetcher),
            Rc::new(FeedRsParser),
            Rc::new(SequentialIds::new()),
        ))
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> AppState {
        self.store.borrow().state().clone()
    }

    /// Registers the single state observer (e.g. a renderer).
    ///
    /// The observer runs while the store is mutably borrowed, so it must read
    /// the `&AppState` it is given. Calling back into this aggregator from
    /// inside it (e.g. [`snapshot`](Self::snapshot) or
    /// [`open_post`](Self::open_post)) panics with a `RefCell` borrow error.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: FnMut(StatePath, &AppState) + 'static,
    {
        self.store.borrow_mut().subscribe(observer);
    }

    /// Builds a polling scheduler sharing this aggregator's store and collaborators.
    pub fn scheduler(&self, interval: Duration) -> Scheduler {
        Scheduler::new(
            Rc::clone(&self.store),
            Rc::clone(&self.fetcher),
            Rc::clone(&self.parser),
            Rc::clone(&self.ids),
            interval,
        )
    }

    /// Handles a user submission of `input` as a new feed URL.
    ///
    /// Validation failures short-circuit before any network call and leave the
    /// form `Invalid`. Fetch or parse failures set loading to `Error` and the
    /// form to `Invalid`, both carrying the error kind. On success the feed and
    /// its initial posts appear in one observer notification and loading
    /// becomes `Success`.
    pub async fn submit(&self, input: &str) -> Result<Feed, SubmitError> {
        self.store.borrow_mut().mutate(StatePath::Form, |state| {
            state.form.status = FormStatus::Filling;
            state.form.input_value = input.to_owned();
        });

        let existing = self.store.borrow().feed_links();
        let link = match validate_url(input, &existing).await {
            Ok(link) => link,
            Err(e) => {
                tracing::debug!(input = %input, error = %e, "Submission rejected");
                self.set_form_error(e.kind());
                return Err(e.into());
            }
        };

        {
            let mut store = self.store.borrow_mut();
            store.mutate(StatePath::Form, |state| {
                state.form.status = FormStatus::Valid;
                state.form.error = None;
            });
            store.mutate(StatePath::Loading, |state| {
                state.loading.status = LoadingStatus::Sending;
                state.loading.error = None;
            });
        }

        match self.load_feed(link).await {
            Ok(feed) => {
                self.store.borrow_mut().mutate(StatePath::Loading, |state| {
                    state.loading.status = LoadingStatus::Success;
                });
                tracing::info!(feed_id = %feed.id, link = %feed.link, title = %feed.title, "Subscribed");
                Ok(feed)
            }
            Err(e) => {
                tracing::warn!(input = %input, kind = %e.kind(), error = %e, "Subscription failed");
                let kind = e.kind();
                self.store.borrow_mut().mutate(StatePath::Loading, |state| {
                    state.loading.status = LoadingStatus::Error;
                    state.loading.error = Some(kind);
                });
                self.set_form_error(kind);
                Err(e)
            }
        }
    }

    /// Opens a post in the preview and marks it viewed.
    pub fn open_post(&self, post_id: PostId) -> Result<(), UnknownPost> {
        self.store.borrow_mut().open_post(post_id)
    }

    pub fn close_post(&self) {
        self.store.borrow_mut().close_post();
    }

    async fn load_feed(&self, link: String) -> Result<Feed, SubmitError> {
        let raw = self.fetcher.fetch(&link).await?;
        let parsed = self.parser.parse(&raw, None)?;

        let meta = parsed.feed.unwrap_or_else(|| FeedMeta {
            title: link.clone(),
            description: String::new(),
        });

        let (feed, _) =
            self.store
                .borrow_mut()
                .register_feed(link, meta, parsed.posts, self.ids.as_ref())?;
        Ok(feed)
    }

    fn set_form_error(&self, kind: ErrorKind) {
        self.store.borrow_mut().mutate(StatePath::Form, |state| {
            state.form.status = FormStatus::Invalid;
            state.form.error = Some(kind);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LoadingState;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <description>Example feed</description>
    <item><title>A</title><link>https://example.com/a</link></item>
    <item><title>B</title><link>https://example.com/b</link></item>
</channel></rss>"#;

    struct FixedFetcher {
        body: Result<&'static str, u16>,
        calls: AtomicUsize,
    }

    impl FixedFetcher {
        fn ok(body: &'static str) -> Self {
            Self {
                body: Ok(body),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                body: Err(status),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FeedFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body
                .map(str::to_owned)
                .map_err(FetchError::HttpStatus)
        }
    }

    fn aggregator(fetcher: Rc<FixedFetcher>) -> Aggregator {
        Aggregator::new(fetcher, Rc::new(FeedRsParser), Rc::new(SequentialIds::new()))
    }

    #[tokio::test]
    async fn test_submit_success_sets_states() {
        let agg = aggregator(Rc::new(FixedFetcher::ok(FEED)));

        let feed = agg.submit("https://example.com/feed.xml").await.unwrap();

        let state = agg.snapshot();
        assert_eq!(feed.link, "https://example.com/feed.xml");
        assert_eq!(feed.title, "Example");
        assert_eq!(state.form.status, FormStatus::Valid);
        assert_eq!(state.form.error, None);
        assert_eq!(state.loading.status, LoadingStatus::Success);
        assert_eq!(state.feeds.len(), 1);
        assert_eq!(state.posts.len(), 2);
        assert!(state.posts.iter().all(|p| p.feed_id == feed.id));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_request() {
        let fetcher = Rc::new(FixedFetcher::ok(FEED));
        let agg = aggregator(Rc::clone(&fetcher));

        let err = agg.submit("   ").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyInput);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        let state = agg.snapshot();
        assert_eq!(state.form.status, FormStatus::Invalid);
        assert_eq!(state.form.error, Some(ErrorKind::EmptyInput));
        assert_eq!(state.loading, LoadingState::default());
    }

    #[tokio::test]
    async fn test_network_failure_sets_error_states() {
        let agg = aggregator(Rc::new(FixedFetcher::failing(503)));

        let err = agg.submit("https://example.com/feed.xml").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkError);
        let state = agg.snapshot();
        assert_eq!(state.loading.status, LoadingStatus::Error);
        assert_eq!(state.loading.error, Some(ErrorKind::NetworkError));
        assert_eq!(state.form.status, FormStatus::Invalid);
        assert_eq!(state.form.error, Some(ErrorKind::NetworkError));
        assert!(state.feeds.is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_sets_error_states() {
        let agg = aggregator(Rc::new(FixedFetcher::ok("<html>nope</html>")));

        let err = agg.submit("https://example.com/page").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ParseError);
        let state = agg.snapshot();
        assert_eq!(state.loading.error, Some(ErrorKind::ParseError));
        assert_eq!(state.form.error, Some(ErrorKind::ParseError));
        assert!(state.feeds.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let fetcher = Rc::new(FixedFetcher::ok(FEED));
        let agg = aggregator(Rc::clone(&fetcher));

        agg.submit("https://example.com/feed.xml").await.unwrap();
        let err = agg.submit("https://example.com/feed.xml").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateFeed);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(agg.snapshot().feeds.len(), 1);
    }

    #[tokio::test]
    async fn test_equivalent_url_rejected_in_either_order() {
        let fetcher = Rc::new(FixedFetcher::ok(FEED));
        let agg = aggregator(Rc::clone(&fetcher));

        agg.submit("https://example.com").await.unwrap();
        let err = agg.submit("https://example.com/").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateFeed);
        let err = agg.submit("HTTPS://EXAMPLE.COM").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateFeed);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        let state = agg.snapshot();
        assert_eq!(state.feeds.len(), 1);
        assert_eq!(state.feeds[0].link, "https://example.com");
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let agg = aggregator(Rc::new(FixedFetcher::ok(FEED)));

        agg.submit("nope").await.unwrap_err();
        assert_eq!(agg.snapshot().form.error, Some(ErrorKind::InvalidUrl));

        agg.submit("https://example.com/feed.xml").await.unwrap();
        let state = agg.snapshot();
        assert_eq!(state.form.error, None);
        assert_eq!(state.form.input_value, "https://example.com/feed.xml");
    }

    #[tokio::test]
    async fn test_observer_sees_submission_paths_in_order() {
        let agg = aggregator(Rc::new(FixedFetcher::ok(FEED)));
        let paths = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&paths);
        agg.subscribe(move |path, _| sink.borrow_mut().push(path));

        agg.submit("https://example.com/feed.xml").await.unwrap();

        assert_eq!(
            *paths.borrow(),
            vec![
                StatePath::Form,
                StatePath::Form,
                StatePath::Loading,
                StatePath::Subscription,
                StatePath::Loading,
            ]
        );
    }

    #[tokio::test]
    async fn test_observer_state_matches_snapshot() {
        let agg = aggregator(Rc::new(FixedFetcher::ok(FEED)));
        let last = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&last);
        agg.subscribe(move |_, state| *sink.borrow_mut() = Some(state.clone()));

        agg.submit("https://example.com/feed.xml").await.unwrap();

        assert_eq!(last.borrow().as_ref(), Some(&agg.snapshot()));
    }

    #[test]
    fn test_from_config_rejects_invalid_user_agent() {
        let config = Config {
            user_agent: "bad\nagent".to_string(),
            ..Config::default()
        };
        let err = Aggregator::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("HTTP client"));
    }

    #[tokio::test]
    async fn test_open_post_through_aggregator() {
        let agg = aggregator(Rc::new(FixedFetcher::ok(FEED)));
        agg.submit("https://example.com/feed.xml").await.unwrap();
        let post_id = agg.snapshot().posts[0].id;

        agg.open_post(post_id).unwrap();
        assert_eq!(agg.snapshot().ui.modal_post_id, Some(post_id));

        agg.close_post();
        assert_eq!(agg.snapshot().ui.modal_post_id, None);
    }
}
