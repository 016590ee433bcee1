//! Telegram channel: bot integration via `teloxide`.
//!
//! - Long polling (no webhook/public IP needed)
//! - Text messages only; everything else is ignored
//! - Allow-list by user ID or username
//! - Plain-text replies, split at the 4096-char limit

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, UpdateKind};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use feedbot_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use feedbot_core::types::TELEGRAM;
use feedbot_core::utils::sender_matches;

use crate::base::Channel;
use crate::formatting::split_message;

/// Telegram message length limit.
const TELEGRAM_MAX_LEN: usize = 4096;

/// Telegram bot channel using long polling.
pub struct TelegramChannel {
    bot: Bot,
    bus: Arc<MessageBus>,
    /// Allow-list of user IDs / usernames. Empty = allow everyone.
    allowed_users: Vec<String>,
    shutdown: Arc<Notify>,
}

impl TelegramChannel {
    pub fn new(token: &str, bus: Arc<MessageBus>, allowed_users: Vec<String>) -> Self {
        Self {
            bot: Bot::new(token),
            bus,
            allowed_users,
            shutdown: Arc::new(Notify::new()),
        }
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        sender_matches(sender_id, &self.allowed_users)
    }

    /// Publish a text message from an allowed sender to the inbound bus.
    async fn handle_update(&self, update: &Update) {
        let UpdateKind::Message(message) = &update.kind else {
            return;
        };
        let Some(user) = message.from.as_ref() else {
            return;
        };
        let Some(text) = message.text() else {
            debug!("non-text telegram message, ignoring");
            return;
        };

        let username = user.username.as_deref().unwrap_or("");
        let sender_id = format!("{}|{}", user.id.0, username);
        let chat_id = message.chat.id.0;

        if !self.is_allowed(&sender_id) {
            warn!(
                sender = %sender_id,
                chat_id,
                "telegram message from unauthorized user, ignoring"
            );
            return;
        }

        debug!(sender = %sender_id, chat_id, content_len = text.len(), "telegram inbound message");

        let inbound = InboundMessage::new(TELEGRAM, &sender_id, chat_id, text);

        if let Err(e) = self.bus.publish_inbound(inbound).await {
            error!(error = %e, "failed to publish telegram message to bus");
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        TELEGRAM
    }

    async fn start(&self) -> anyhow::Result<()> {
        info!("starting telegram channel (long polling)");

        let commands = vec![
            BotCommand::new("sub", "Subscribe to one or more feed URLs"),
            BotCommand::new("unsub", "Unsubscribe by URL or title"),
            BotCommand::new("list", "Show subscriptions"),
            BotCommand::new("help", "Show available commands"),
        ];
        if let Err(e) = self.bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to set bot commands menu");
        }

        info!("telegram bot connected, polling for updates");

        let mut offset: i32 = 0;
        loop {
            tokio::select! {
                updates = self.bot.get_updates().offset(offset).timeout(30).send() => {
                    match updates {
                        Ok(updates) => {
                            for update in &updates {
                                offset = (update.id.0 as i32).wrapping_add(1);
                                self.handle_update(update).await;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "telegram polling error");
                            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("telegram channel shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        info!("stopping telegram channel");
        self.shutdown.notify_waiters();
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        for chunk in split_message(&msg.content, TELEGRAM_MAX_LEN) {
            self.bot
                .send_message(ChatId(msg.chat_id), chunk)
                .await
                .map_err(|e| anyhow::anyhow!("telegram send to {} failed: {e}", msg.chat_id))?;
        }
        debug!(chat_id = msg.chat_id, "telegram message sent");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
