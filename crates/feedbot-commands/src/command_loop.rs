//! Command loop: reads chat messages off the inbound bus, one at a time,
//! and answers each with a reply on the outbound bus.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use feedbot_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use feedbot_core::utils::sender_matches;
use feedbot_core::ChatId;
use feedbot_feeds::{FeedSource, FeedState};

use crate::command::Command;

pub const USAGE: &str = "Hello
I'm Feedbot
here's what I can do:

sub <url>: subscribe to rss feed @ url
unsub <url>: unsubscribe to rss feed @url
list: show subscriptions
update: check all feeds now
help: show this message";

/// Applies chat commands to the shared [`FeedState`].
pub struct CommandLoop {
    state: Arc<FeedState>,
    source: Arc<dyn FeedSource>,
    bus: Arc<MessageBus>,
    /// Notified by `update`; `None` when no poller is running.
    poll_trigger: Option<Arc<Notify>>,
    /// Who may run `update`. Empty means everyone.
    admin_users: Vec<String>,
    shutdown: Arc<Notify>,
}

impl CommandLoop {
    pub fn new(state: Arc<FeedState>, source: Arc<dyn FeedSource>, bus: Arc<MessageBus>) -> Self {
        Self {
            state,
            source,
            bus,
            poll_trigger: None,
            admin_users: Vec::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_poll_trigger(mut self, trigger: Arc<Notify>) -> Self {
        self.poll_trigger = Some(trigger);
        self
    }

    pub fn with_admin_users(mut self, admin_users: Vec<String>) -> Self {
        self.admin_users = admin_users;
        self
    }

    /// Consume inbound messages until stopped or the bus closes.
    pub async fn run(&self) {
        info!("command loop started, waiting for messages");
        loop {
            let msg = tokio::select! {
                msg = self.bus.consume_inbound() => msg,
                _ = self.shutdown.notified() => {
                    info!("command loop shutting down");
                    break;
                }
            };

            let Some(msg) = msg else {
                info!("inbound channel closed, command loop exiting");
                break;
            };

            if let Some(reply) = self.handle(&msg).await {
                if let Err(e) = self.bus.publish_outbound(reply).await {
                    error!(error = %e, "failed to publish reply");
                }
            }
        }
    }

    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// Handle one message. Empty messages get no reply.
    pub async fn handle(&self, msg: &InboundMessage) -> Option<OutboundMessage> {
        let command = Command::parse(&msg.content)?;
        debug!(chat_id = msg.chat_id, sender = %msg.sender_id, command = ?command, "received command");
        let text = self.execute(command, msg).await;
        Some(OutboundMessage::reply_to(msg, text))
    }

    async fn execute(&self, command: Command, msg: &InboundMessage) -> String {
        match command {
            Command::Subscribe(urls) => self.subscribe(msg.chat_id, &urls).await,
            Command::Unsubscribe { url, query } => self.unsubscribe(msg.chat_id, &url, &query).await,
            Command::List => self.list(msg.chat_id).await,
            Command::Update => self.update(&msg.sender_id),
            Command::Help => USAGE.to_string(),
        }
    }

    /// Add every URL concurrently and report each outcome once all are done.
    async fn subscribe(&self, chat: ChatId, urls: &[String]) -> String {
        if urls.is_empty() {
            return "Please provide a url to subscribe to".to_string();
        }
        self.state.seen.check_initialized(chat).await;

        let adds = urls
            .iter()
            .map(|url| self.state.registry.add(url, chat, self.source.as_ref()));
        let results = join_all(adds).await;

        let mut ok = 0;
        let mut lines = Vec::with_capacity(urls.len());
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(title) => {
                    ok += 1;
                    lines.push(format!("{title}: {url}"));
                }
                Err(e) => {
                    warn!(chat_id = chat, url = %url, error = %e, "subscribe failed");
                    lines.push(format!("Failed {url}: {e}"));
                }
            }
        }

        format!(
            "Subscribed to {ok} of {} feeds\n\n{}",
            urls.len(),
            lines.join("\n")
        )
    }

    async fn unsubscribe(&self, chat: ChatId, url: &str, query: &str) -> String {
        if url.is_empty() {
            return "Please provide a url to unsubscribe from".to_string();
        }
        match self.state.registry.remove(url, query, chat).await {
            Ok(title) => format!("Unsubscribed from {title}"),
            Err(e) => format!("Error unsubscribing from {url}: {e}"),
        }
    }

    async fn list(&self, chat: ChatId) -> String {
        let subs = self.state.registry.list(chat).await;
        if subs.is_empty() {
            "You are not subscribed to any feeds".to_string()
        } else {
            format!("You are subscribed to:\n\n{}", subs.join("\n"))
        }
    }

    fn update(&self, sender_id: &str) -> String {
        if !sender_matches(sender_id, &self.admin_users) {
            warn!(sender = %sender_id, "update denied");
            return "You are not allowed to run updates".to_string();
        }
        match &self.poll_trigger {
            Some(trigger) => {
                info!(sender = %sender_id, "manual update requested");
                trigger.notify_one();
                "update started".to_string()
            }
            None => "Updates are not available".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
