//! Shared bot state and its durable form.
//!
//! `FeedState` bundles the registry and the seen-set store with the
//! storage they are persisted to. The whole thing is one JSON document:
//!
//! ```json
//! {"feeds": {"<url>": {"title": "...", "subscribers": [1, 2]}},
//!  "seen":  {"1": ["2024-05-01T10:00:00Z-Title"]}}
//! ```
//!
//! Sets are written as sorted arrays and rebuilt into sets on load.
//!
//! Documents written by the earlier deployment of the bot are read as
//! well: `{"Feeds": {"<url>": {"Title": "...", "Chats": {"1": {}}}},
//! "Seens": {"1": [...]}}`. They are rewritten in the current shape on the
//! next persist.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use feedbot_core::ChatId;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::article::ArticleKey;
use crate::error::Result;
use crate::registry::{Feed, SubscriptionRegistry};
use crate::seen::{SeenSet, SeenSetStore};
use crate::storage::Storage;

/// Serialized form of a [`Feed`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFeed {
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Chats", deserialize_with = "chat_ids")]
    pub subscribers: Vec<ChatId>,
}

/// Subscribers as either `[1, 2]` or the older `{"1": {}, "2": {}}`.
fn chat_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<ChatId>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ChatIds;

    impl<'de> Visitor<'de> for ChatIds {
        type Value = Vec<ChatId>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of chat ids or a map keyed by chat id")
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
            let mut ids = Vec::new();
            while let Some(id) = seq.next_element()? {
                ids.push(id);
            }
            Ok(ids)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut ids = Vec::new();
            while let Some((id, IgnoredAny)) = map.next_entry::<ChatId, IgnoredAny>()? {
                ids.push(id);
            }
            Ok(ids)
        }
    }

    deserializer.deserialize_any(ChatIds)
}

/// Serialized form of the whole state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, alias = "Feeds")]
    pub feeds: BTreeMap<String, PersistedFeed>,
    #[serde(default, alias = "Seens")]
    pub seen: BTreeMap<ChatId, Vec<ArticleKey>>,
}

impl PersistedState {
    pub fn encode(feeds: &BTreeMap<String, Feed>, seen: &HashMap<ChatId, SeenSet>) -> Self {
        let feeds = feeds
            .iter()
            .map(|(url, feed)| {
                (
                    url.clone(),
                    PersistedFeed {
                        title: feed.title.clone(),
                        // BTreeSet iterates sorted
                        subscribers: feed.subscribers.iter().copied().collect(),
                    },
                )
            })
            .collect();

        let seen = seen
            .iter()
            .map(|(chat, set)| {
                let mut keys: Vec<ArticleKey> = set.iter().cloned().collect();
                keys.sort();
                (*chat, keys)
            })
            .collect();

        Self { feeds, seen }
    }

    pub fn decode(self) -> (BTreeMap<String, Feed>, HashMap<ChatId, SeenSet>) {
        let feeds = self
            .feeds
            .into_iter()
            .map(|(url, feed)| {
                (
                    url,
                    Feed {
                        title: feed.title,
                        subscribers: feed.subscribers.into_iter().collect(),
                    },
                )
            })
            .collect();

        let seen = self
            .seen
            .into_iter()
            .map(|(chat, keys)| (chat, keys.into_iter().collect()))
            .collect();

        (feeds, seen)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Registry, seen sets and where they are stored.
pub struct FeedState {
    pub registry: SubscriptionRegistry,
    pub seen: SeenSetStore,
    storage: Arc<dyn Storage>,
    key: String,
}

impl FeedState {
    /// Empty state backed by `storage` under `key`.
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            seen: SeenSetStore::new(),
            storage,
            key: key.into(),
        }
    }

    /// Load state from `storage`.
    ///
    /// A missing document, an unreadable one or one that fails to decode
    /// all give empty state; the problem is logged, never returned.
    pub async fn restore(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        let state = Self::new(storage, key);

        let bytes = match state.storage.read(&state.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(location = %state.location(), "no saved state, starting empty");
                return state;
            }
            Err(e) => {
                warn!(location = %state.location(), error = %e, "failed to read saved state, starting empty");
                return state;
            }
        };

        match PersistedState::from_bytes(&bytes) {
            Ok(persisted) => {
                let (feeds, seen) = persisted.decode();
                state.registry.replace(feeds).await;
                state.seen.replace(seen).await;
                let (feeds, chats, keys) = state.stats().await;
                info!(
                    location = %state.location(),
                    feeds,
                    chats,
                    keys,
                    "restored state"
                );
            }
            Err(e) => {
                warn!(location = %state.location(), error = %e, "saved state is corrupt, starting empty");
            }
        }
        state
    }

    /// Current state in persisted form.
    pub async fn snapshot(&self) -> PersistedState {
        let feeds = self.registry.snapshot().await;
        let seen = self.seen.snapshot().await;
        PersistedState::encode(&feeds, &seen)
    }

    /// Write the current state to storage.
    pub async fn persist(&self) -> Result<()> {
        let bytes = self.snapshot().await.to_bytes()?;
        self.storage.write(&self.key, &bytes).await?;
        info!(location = %self.location(), bytes = bytes.len(), "state persisted");
        Ok(())
    }

    /// `(feeds, chats, seen keys)`.
    pub async fn stats(&self) -> (usize, usize, usize) {
        let feeds = self.registry.len().await;
        let (chats, keys) = self.seen.stats().await;
        (feeds, chats, keys)
    }

    /// `<storage>/<key>`, for logs.
    pub fn location(&self) -> String {
        format!("{}/{}", self.storage.describe(), self.key)
    }
}

impl std::fmt::Debug for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedState")
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}
