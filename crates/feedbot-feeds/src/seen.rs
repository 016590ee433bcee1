//! Seen-set store: which article keys each chat has already been sent.
//!
//! Sets only grow. A chat's set is created empty the first time it is
//! touched.

use std::collections::{HashMap, HashSet};

use feedbot_core::ChatId;
use tokio::sync::RwLock;

use crate::article::ArticleKey;

/// Keys already delivered to one chat.
pub type SeenSet = HashSet<ArticleKey>;

/// Per-chat seen sets behind one async lock.
#[derive(Debug, Default)]
pub struct SeenSetStore {
    inner: RwLock<HashMap<ChatId, SeenSet>>,
}

impl SeenSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a (possibly empty) set exists for `chat`.
    pub async fn check_initialized(&self, chat: ChatId) {
        let mut inner = self.inner.write().await;
        inner.entry(chat).or_default();
    }

    /// Insert `key` for `chat`, returning whether it was already present.
    ///
    /// This is the dedup gate: deliver only when it returns `false`.
    pub async fn mark_seen(&self, chat: ChatId, key: ArticleKey) -> bool {
        let mut inner = self.inner.write().await;
        !inner.entry(chat).or_default().insert(key)
    }

    pub async fn is_seen(&self, chat: ChatId, key: &ArticleKey) -> bool {
        let inner = self.inner.read().await;
        inner.get(&chat).is_some_and(|set| set.contains(key))
    }

    /// Whether `chat` has a set at all.
    pub async fn is_initialized(&self, chat: ChatId) -> bool {
        self.inner.read().await.contains_key(&chat)
    }

    /// Copy of every set, for persistence.
    pub async fn snapshot(&self) -> HashMap<ChatId, SeenSet> {
        self.inner.read().await.clone()
    }

    /// Replace all sets.
    pub async fn replace(&self, sets: HashMap<ChatId, SeenSet>) {
        *self.inner.write().await = sets;
    }

    /// `(chats, total keys)`.
    pub async fn stats(&self) -> (usize, usize) {
        let inner = self.inner.read().await;
        (inner.len(), inner.values().map(HashSet::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(s: &str) -> ArticleKey {
        ArticleKey::from(s.to_string())
    }

    #[tokio::test]
    async fn test_mark_seen_twice() {
        let store = SeenSetStore::new();
        assert!(!store.mark_seen(1, key("k")).await);
        assert!(store.mark_seen(1, key("k")).await);
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let store = SeenSetStore::new();
        assert!(!store.mark_seen(1, key("k")).await);
        assert!(!store.mark_seen(2, key("k")).await);
        assert!(store.is_seen(1, &key("k")).await);
        assert!(!store.is_seen(3, &key("k")).await);
    }

    #[tokio::test]
    async fn test_check_initialized_creates_empty_set() {
        let store = SeenSetStore::new();
        assert!(!store.is_initialized(5).await);
        store.check_initialized(5).await;
        assert!(store.is_initialized(5).await);
        assert_eq!(store.stats().await, (1, 0));

        // Does not clear an existing set
        store.mark_seen(5, key("a")).await;
        store.check_initialized(5).await;
        assert!(store.is_seen(5, &key("a")).await);
    }

    #[tokio::test]
    async fn test_mark_seen_creates_set_lazily() {
        let store = SeenSetStore::new();
        store.mark_seen(9, key("a")).await;
        assert!(store.is_initialized(9).await);
    }

    #[tokio::test]
    async fn test_concurrent_mark_seen_single_winner() {
        let store = Arc::new(SeenSetStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.mark_seen(1, key("same")).await }));
        }

        let mut first_sightings = 0;
        for h in handles {
            if !h.await.unwrap() {
                first_sightings += 1;
            }
        }
        assert_eq!(first_sightings, 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_replace() {
        let store = SeenSetStore::new();
        store.mark_seen(1, key("a")).await;
        store.mark_seen(1, key("b")).await;
        let snap = store.snapshot().await;

        let other = SeenSetStore::new();
        other.replace(snap).await;
        assert_eq!(other.stats().await, (1, 2));
        assert!(other.is_seen(1, &key("b")).await);
    }
}
