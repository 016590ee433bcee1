//! Channel trait: the interface every chat transport implements.
//!
//! - `start()`: receive messages and publish them to the bus (long-running)
//! - `stop()`: graceful shutdown
//! - `send()`: deliver an outbound message to a chat
//! - `name()`: routing key matching `OutboundMessage.channel`

use async_trait::async_trait;
use feedbot_core::bus::OutboundMessage;

/// A chat transport.
///
/// The `ChannelManager` holds `Arc<dyn Channel>` and drives start, stop
/// and send across all registered transports.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique channel name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Listen for incoming messages until `stop()` is called.
    async fn start(&self) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()>;

    /// Send one message. An error is a transport failure for that message only.
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()>;
}
