//! One poll cycle.
//!
//! Every known feed is fetched concurrently, one task per feed. For each
//! subscriber of a feed, every item's key is marked seen; items that were
//! new and newer than the cutoff are collected. Once all feed tasks are
//! done, each chat's items are sorted by key across feeds and their links
//! published to the outbound bus, which the channel dispatcher drains.
//! A feed that fails to fetch is logged and skipped for this cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use feedbot_core::bus::{MessageBus, OutboundMessage};
use feedbot_core::types::TELEGRAM;
use feedbot_core::ChatId;
use feedbot_feeds::{ArticleKey, FeedError, FeedSource, FeedState, FetchedFeed};

/// Totals for one cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Feeds polled.
    pub feeds: usize,
    /// Feeds that failed to fetch or parse.
    pub failed: usize,
    /// Messages queued for delivery.
    pub queued: usize,
    /// Items with no usable timestamp.
    pub skipped: usize,
    /// Messages the bus refused.
    pub undelivered: usize,
}

/// What one feed task produced: counters plus the deliverable items,
/// not yet ordered across feeds.
#[derive(Debug, Default)]
struct FeedOutcome {
    failed: bool,
    skipped: usize,
    pending: Vec<(ChatId, ArticleKey, String)>,
}

/// Polls all feeds in a [`FeedState`] once per [`run`](Self::run).
#[derive(Clone)]
pub struct PollCycle {
    state: Arc<FeedState>,
    source: Arc<dyn FeedSource>,
    bus: Arc<MessageBus>,
    window: Duration,
    channel: String,
}

impl PollCycle {
    /// Cycle delivering on the Telegram channel with the given staleness window.
    pub fn new(
        state: Arc<FeedState>,
        source: Arc<dyn FeedSource>,
        bus: Arc<MessageBus>,
        window: Duration,
    ) -> Self {
        Self {
            state,
            source,
            bus,
            window,
            channel: TELEGRAM.to_string(),
        }
    }

    /// Route outbound messages to a different channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn state(&self) -> &Arc<FeedState> {
        &self.state
    }

    pub async fn run(&self) -> CycleReport {
        self.run_at(Utc::now()).await
    }

    /// Run a cycle as if the current time were `now`.
    ///
    /// Returns once every feed task has finished; all messages are on the
    /// bus by then.
    pub async fn run_at(&self, now: DateTime<Utc>) -> CycleReport {
        let cutoff = ArticleKey::cutoff(now, self.window);
        let feeds = self.state.registry.snapshot().await;
        info!(feeds = feeds.len(), cutoff = %cutoff, "poll cycle started");

        let mut tasks = JoinSet::new();
        for (url, feed) in feeds {
            let this = self.clone();
            let cutoff = cutoff.clone();
            let subscribers: Vec<ChatId> = feed.subscribers.into_iter().collect();
            tasks.spawn(async move { this.poll_feed(&url, &subscribers, &cutoff).await });
        }

        let mut report = CycleReport::default();
        let mut per_chat: BTreeMap<ChatId, Vec<(ArticleKey, String)>> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            report.feeds += 1;
            match joined {
                Ok(outcome) => {
                    report.failed += usize::from(outcome.failed);
                    report.skipped += outcome.skipped;
                    for (chat, key, link) in outcome.pending {
                        per_chat.entry(chat).or_default().push((key, link));
                    }
                }
                Err(e) => {
                    error!(error = %e, "feed task panicked");
                    report.failed += 1;
                }
            }
        }

        for (chat, mut queue) in per_chat {
            queue.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, link) in queue {
                match self.deliver(chat, link).await {
                    Ok(()) => report.queued += 1,
                    Err(e) => {
                        error!(chat_id = chat, error = %e, "failed to queue article");
                        report.undelivered += 1;
                    }
                }
            }
        }

        info!(
            feeds = report.feeds,
            failed = report.failed,
            queued = report.queued,
            skipped = report.skipped,
            "poll cycle finished"
        );
        report
    }

    async fn poll_feed(&self, url: &str, subscribers: &[ChatId], cutoff: &ArticleKey) -> FeedOutcome {
        let fetched = match self.source.fetch(url).await {
            Ok(f) => f,
            Err(e) => {
                warn!(feed = %url, error = %e, "failed to fetch feed");
                return FeedOutcome {
                    failed: true,
                    ..FeedOutcome::default()
                };
            }
        };
        debug!(feed = %url, items = fetched.items.len(), subscribers = subscribers.len(), "fetched feed");

        let mut outcome = FeedOutcome::default();
        for &chat in subscribers {
            outcome.skipped += self
                .collect_new(url, chat, &fetched, cutoff, &mut outcome.pending)
                .await;
        }
        outcome
    }

    /// Mark every item seen for `chat` and push those that were unseen and
    /// newer than `cutoff` onto `pending`. Returns the number of items
    /// skipped for lack of a timestamp.
    async fn collect_new(
        &self,
        url: &str,
        chat: ChatId,
        feed: &FetchedFeed,
        cutoff: &ArticleKey,
        pending: &mut Vec<(ChatId, ArticleKey, String)>,
    ) -> usize {
        let mut skipped = 0;
        for item in &feed.items {
            let Some(key) = item.key() else {
                warn!(feed = %url, title = %item.title, "item has no timestamp, skipping");
                skipped += 1;
                continue;
            };
            let already_seen = self.state.seen.mark_seen(chat, key.clone()).await;
            if !already_seen && key > *cutoff {
                pending.push((chat, key, item.link.clone()));
            }
        }
        skipped
    }

    async fn deliver(&self, chat: ChatId, link: String) -> Result<(), FeedError> {
        self.bus
            .publish_outbound(OutboundMessage::new(&self.channel, chat, link))
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
