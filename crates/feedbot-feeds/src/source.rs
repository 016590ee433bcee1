//! Feed sources: download and parse a feed into titled, timestamped items.
//!
//! Parsing is delegated to `feed-rs`, which handles RSS 0.x/1.0/2.0, Atom
//! and JSON Feed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::article::ArticleKey;
use crate::error::{FeedError, Result};

/// One entry of a fetched feed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// The item's `ArticleKey`, if it carries a timestamp.
    pub fn key(&self) -> Option<ArticleKey> {
        ArticleKey::derive(&self.title, self.published, self.updated)
    }
}

/// A parsed feed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedFeed {
    pub title: String,
    /// Items in document order.
    pub items: Vec<FeedItem>,
}

/// Anything that can turn a URL into a parsed feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed>;
}

/// Fetches feeds over HTTP(S).
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("feedbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::fetch(url, e))?;

        if !response.status().is_success() {
            return Err(FeedError::fetch(url, format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| FeedError::fetch(url, e))?;
        let feed = parse_feed(&bytes).map_err(|e| FeedError::fetch(url, e))?;
        debug!(url = %url, items = feed.items.len(), "fetched feed");
        Ok(feed)
    }
}

/// Parse raw feed bytes.
pub fn parse_feed(bytes: &[u8]) -> std::result::Result<FetchedFeed, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
                .or_else(|| entry.links.first())
                .map(|l| l.href.clone())
                .unwrap_or_default();

            FeedItem {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                link,
                published: entry.published,
                updated: entry.updated,
            }
        })
        .collect();

    Ok(FetchedFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        items,
    })
}
