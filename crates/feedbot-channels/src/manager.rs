//! Channel Manager: transport lifecycle and outbound delivery.
//!
//! The outbound half of the message bus is the delivery queue. Exactly one
//! dispatcher task drains it and hands each message to the channel named
//! in `OutboundMessage.channel`. A failed send is logged and the next
//! message is sent anyway; nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use feedbot_core::bus::MessageBus;

use crate::base::Channel;

/// Owns the registered channels and the outbound dispatcher.
pub struct ChannelManager {
    channels: HashMap<String, Arc<dyn Channel>>,
    bus: Arc<MessageBus>,
    shutdown: Arc<Notify>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChannelManager {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self {
            channels: HashMap::new(),
            bus,
            shutdown: Arc::new(Notify::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register a channel. Overwrites any previous channel with the same name.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        info!(channel = %name, "registered channel");
        self.channels.insert(name, channel);
    }

    /// Names of all registered channels, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Start every channel and the outbound dispatcher, then wait for
    /// [`stop_all`](Self::stop_all).
    ///
    /// The dispatcher runs even with no channels registered; it then
    /// drops every message with a warning.
    pub async fn start_all(&self) -> Result<()> {
        if self.channels.is_empty() {
            warn!("no channels registered, outbound messages will be dropped");
        } else {
            info!(
                channels = ?self.channel_names(),
                "starting {} channel(s)",
                self.channels.len()
            );
        }

        let mut tasks = self.tasks.lock().await;

        for (name, channel) in &self.channels {
            let ch = channel.clone();
            let ch_name = name.clone();
            tasks.push(tokio::spawn(async move {
                info!(channel = %ch_name, "channel starting");
                if let Err(e) = ch.start().await {
                    error!(channel = %ch_name, error = %e, "channel start failed");
                }
                info!(channel = %ch_name, "channel stopped");
            }));
        }

        let bus = self.bus.clone();
        let channels = self.channels.clone();
        let shutdown = self.shutdown.clone();
        tasks.push(tokio::spawn(async move {
            Self::dispatch_outbound(bus, channels, shutdown).await;
        }));
        drop(tasks);

        self.shutdown.notified().await;
        info!("channel manager shutting down");
        Ok(())
    }

    /// Stop all channels and the dispatcher.
    pub async fn stop_all(&self) {
        info!("stopping all channels");
        self.shutdown.notify_waiters();

        for (name, channel) in &self.channels {
            debug!(channel = %name, "stopping channel");
            if let Err(e) = channel.stop().await {
                error!(channel = %name, error = %e, "channel stop failed");
            }
        }

        // A dispatcher blocked in a send never sees the notification.
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        info!("all channels stopped");
    }

    /// Drain the delivery queue, one message at a time, until shutdown.
    pub async fn dispatch_outbound(
        bus: Arc<MessageBus>,
        channels: HashMap<String, Arc<dyn Channel>>,
        shutdown: Arc<Notify>,
    ) {
        info!("outbound dispatcher started");

        loop {
            tokio::select! {
                msg = bus.consume_outbound() => {
                    let Some(outbound) = msg else {
                        info!("outbound bus closed, dispatcher exiting");
                        break;
                    };
                    debug!(
                        channel = %outbound.channel,
                        chat_id = outbound.chat_id,
                        content_len = outbound.content.len(),
                        "dispatching outbound message"
                    );

                    match channels.get(&outbound.channel) {
                        Some(channel) => {
                            if let Err(e) = channel.send(&outbound).await {
                                error!(
                                    channel = %outbound.channel,
                                    chat_id = outbound.chat_id,
                                    error = %e,
                                    "failed to send outbound message"
                                );
                            }
                        }
                        None => warn!(
                            channel = %outbound.channel,
                            "no channel registered for outbound message"
                        ),
                    }
                }
                _ = shutdown.notified() => {
                    info!("dispatcher received shutdown signal");
                    break;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
