//! Subscription registry: feed URL → cached title and subscriber chats.
//!
//! Feeds are created the first time an unknown URL is successfully
//! fetched and are never deleted; a feed nobody subscribes to any more is
//! kept and still polled. Iteration order is URL order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use feedbot_core::ChatId;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{FeedError, Result};
use crate::source::FeedSource;

/// A subscribed feed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Feed {
    /// Title resolved when the feed was first added.
    pub title: String,
    pub subscribers: BTreeSet<ChatId>,
}

impl Feed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subscribers: BTreeSet::new(),
        }
    }
}

/// All known feeds.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    feeds: RwLock<BTreeMap<String, Feed>>,
    /// One lock per URL currently being added, so a new feed is fetched once.
    adding: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_feeds(feeds: BTreeMap<String, Feed>) -> Self {
        Self {
            feeds: RwLock::new(feeds),
            adding: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe `chat` to `url`, returning the feed title.
    ///
    /// An unknown URL is fetched once through `source` to resolve its
    /// title; if that fails the registry is left untouched. Subscribing
    /// twice is a no-op.
    pub async fn add(&self, url: &str, chat: ChatId, source: &dyn FeedSource) -> Result<String> {
        let url_lock = {
            let mut adding = self.adding.lock().await;
            adding.entry(url.to_string()).or_default().clone()
        };

        let result = {
            let _guard = url_lock.lock().await;
            self.add_locked(url, chat, source).await
        };

        {
            let mut adding = self.adding.lock().await;
            drop(url_lock);
            // Only the map's handle left: nobody else is adding this URL.
            if adding.get(url).is_some_and(|l| Arc::strong_count(l) == 1) {
                adding.remove(url);
            }
        }

        result
    }

    async fn add_locked(&self, url: &str, chat: ChatId, source: &dyn FeedSource) -> Result<String> {
        {
            let mut feeds = self.feeds.write().await;
            if let Some(feed) = feeds.get_mut(url) {
                if feed.subscribers.insert(chat) {
                    info!(url = %url, chat = chat, "subscribed to known feed");
                }
                return Ok(feed.title.clone());
            }
        }

        debug!(url = %url, "resolving title of new feed");
        let fetched = source.fetch(url).await?;

        let mut feeds = self.feeds.write().await;
        let feed = feeds
            .entry(url.to_string())
            .or_insert_with(|| Feed::new(fetched.title));
        feed.subscribers.insert(chat);
        info!(url = %url, title = %feed.title, chat = chat, "subscribed to new feed");
        Ok(feed.title.clone())
    }

    /// Unsubscribe `chat`, returning the title of the feed it was removed from.
    ///
    /// `url` is tried as an exact key first. Otherwise the first feed (in
    /// URL order) whose title contains `query`, ignoring case, is used.
    pub async fn remove(&self, url: &str, query: &str, chat: ChatId) -> Result<String> {
        let mut feeds = self.feeds.write().await;

        if !url.is_empty() {
            if let Some(feed) = feeds.get_mut(url) {
                feed.subscribers.remove(&chat);
                info!(url = %url, chat = chat, "unsubscribed by url");
                return Ok(feed.title.clone());
            }
        }

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(FeedError::NotFound);
        }

        let matched = feeds
            .iter_mut()
            .find(|(_, feed)| feed.title.to_lowercase().contains(&query));

        match matched {
            Some((matched_url, feed)) => {
                feed.subscribers.remove(&chat);
                info!(url = %matched_url, query = %query, chat = chat, "unsubscribed by title");
                Ok(feed.title.clone())
            }
            None => Err(FeedError::NotFound),
        }
    }

    /// `"<title>: <url>"` for every feed `chat` subscribes to.
    pub async fn list(&self, chat: ChatId) -> Vec<String> {
        let feeds = self.feeds.read().await;
        feeds
            .iter()
            .filter(|(_, feed)| feed.subscribers.contains(&chat))
            .map(|(url, feed)| format!("{}: {}", feed.title, url))
            .collect()
    }

    /// Copy of every feed, in URL order.
    pub async fn snapshot(&self) -> BTreeMap<String, Feed> {
        self.feeds.read().await.clone()
    }

    pub async fn get(&self, url: &str) -> Option<Feed> {
        self.feeds.read().await.get(url).cloned()
    }

    /// Replace all feeds.
    pub async fn replace(&self, feeds: BTreeMap<String, Feed>) {
        *self.feeds.write().await = feeds;
    }

    pub async fn len(&self) -> usize {
        self.feeds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.feeds.read().await.is_empty()
    }
}
