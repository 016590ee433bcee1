//! Async message bus built on bounded `tokio::sync::mpsc` channels.
//!
//! The outbound side doubles as the delivery queue: the poller and the
//! command loop are its producers and the channel manager's dispatcher is
//! its single consumer, so every message to the chat transport goes out
//! one at a time. A full queue makes producers wait.

use super::types::{InboundMessage, OutboundMessage};
use tokio::sync::mpsc;

/// Capacity of the delivery queue when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// The message bus connecting transports ↔ command loop / poller.
///
/// - Transports publish to `inbound` (chat commands arriving)
/// - The command loop consumes `inbound` and publishes replies to `outbound`
/// - The poller publishes article links to `outbound`
/// - The channel manager consumes `outbound` and routes to the transport
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: tokio::sync::Mutex<mpsc::Receiver<OutboundMessage>>,
}

impl MessageBus {
    /// Create a new message bus with the given buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size);

        MessageBus {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
        }
    }

    /// Publish a command from a transport (inbound).
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<(), mpsc::error::SendError<InboundMessage>> {
        self.inbound_tx.send(msg).await
    }

    /// Consume the next inbound message (blocks until available).
    /// Returns None if all senders are dropped.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    /// Queue a message for delivery (outbound). Waits while the queue is full.
    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.outbound_tx.send(msg).await
    }

    /// Consume the next outbound message (blocks until available).
    /// Returns None if all senders are dropped.
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        rx.recv().await
    }

    /// Take every outbound message currently queued without waiting.
    pub async fn drain_outbound(&self) -> Vec<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        let mut drained = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
        drained
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
