//! Bus event types: messages flowing between transports, the command loop
//! and the poller.

use crate::types::ChatId;
use chrono::{DateTime, Utc};

/// An inbound chat message (usually a command).
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Transport name (e.g. "telegram").
    pub channel: String,
    /// Sender identifier, formatted `"user_id|username"`.
    pub sender_id: String,
    /// Chat the message arrived in; replies go back here.
    pub chat_id: ChatId,
    /// Text content of the message.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a new inbound message with minimal required fields.
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: ChatId,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An outbound message to a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Transport name used for routing.
    pub channel: String,
    /// Target chat.
    pub chat_id: ChatId,
    /// Text content to send.
    pub content: String,
}

impl OutboundMessage {
    /// Create a new outbound message.
    pub fn new(channel: impl Into<String>, chat_id: ChatId, content: impl Into<String>) -> Self {
        OutboundMessage {
            channel: channel.into(),
            chat_id,
            content: content.into(),
        }
    }

    /// Build a reply addressed to the chat an inbound message came from.
    pub fn reply_to(msg: &InboundMessage, content: impl Into<String>) -> Self {
        Self::new(msg.channel.clone(), msg.chat_id, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_creation() {
        let msg = InboundMessage::new("telegram", "42|alice", 99, "sub https://a.example/rss");

        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.sender_id, "42|alice");
        assert_eq!(msg.chat_id, 99);
        assert_eq!(msg.content, "sub https://a.example/rss");
    }

    #[test]
    fn test_outbound_message_creation() {
        let msg = OutboundMessage::new("telegram", -100, "https://a.example/post/1");

        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.chat_id, -100);
        assert_eq!(msg.content, "https://a.example/post/1");
    }

    #[test]
    fn test_reply_to() {
        let inbound = InboundMessage::new("telegram", "1|x", 55, "list");
        let reply = OutboundMessage::reply_to(&inbound, "You are subscribed to:");
        assert_eq!(reply.channel, "telegram");
        assert_eq!(reply.chat_id, 55);
    }
}
