//! Feedbot Feeds: the state side of the bot.
//!
//! - **article**: `ArticleKey`, the totally ordered identity of a feed item
//! - **seen**: `SeenSetStore`, per-chat record of delivered keys
//! - **registry**: `SubscriptionRegistry`, feed URL → title + subscribers
//! - **source**: `FeedSource` trait and the HTTP implementation
//! - **storage**: `Storage` trait with file, GCS and in-memory backends
//! - **state**: `FeedState`, the shared context and its persisted form

pub mod article;
pub mod error;
pub mod registry;
pub mod seen;
pub mod source;
pub mod state;
pub mod storage;

pub use article::ArticleKey;
pub use error::{FeedError, Result};
pub use registry::{Feed, SubscriptionRegistry};
pub use seen::{SeenSet, SeenSetStore};
pub use source::{FeedItem, FeedSource, FetchedFeed, HttpFeedSource};
pub use state::{FeedState, PersistedFeed, PersistedState};
pub use storage::{
    build_storage, DefaultCredentials, FileStorage, GcsStorage, MemoryStorage, StaticToken, Storage,
    TokenSource,
};
