mod store;
mod types;

pub use store::{DuplicateFeed, Observer, SharedStore, Store, UnknownPost};
pub use types::{
    AppState, Feed, FeedId, FeedMeta, FormState, FormStatus, LoadingState, LoadingStatus, Post,
    PostDraft, PostId, StatePath, UiState,
};
