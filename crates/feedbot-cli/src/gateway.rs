//! Gateway command: runs the bot.
//!
//! Startup sequence:
//! 1. Build storage and restore state
//! 2. Create the message bus (outbound side is the delivery queue)
//! 3. Create the poll service and the command loop
//! 4. Create the channel manager, register Telegram
//! 5. Run until Ctrl+C / SIGTERM, then stop everything and persist once

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use feedbot_channels::ChannelManager;
use feedbot_commands::CommandLoop;
use feedbot_core::bus::MessageBus;
use feedbot_core::config::Config;
use feedbot_feeds::{FeedSource, HttpFeedSource};
use feedbot_poller::{PollCycle, PollService};

use crate::helpers;

/// How long shutdown waits for an in-flight poll cycle.
const POLL_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(config: Config) -> Result<()> {
    helpers::print_banner();
    println!("  Mode: Gateway");
    println!();

    // 1. State
    let state = helpers::open_state(&config).await?;
    let (feeds, chats, keys) = state.stats().await;

    // 2. Bus
    let bus = Arc::new(MessageBus::new(config.poll.queue_capacity));

    // 3. Poller + commands
    let source: Arc<dyn FeedSource> = Arc::new(
        HttpFeedSource::new(config.poll.request_timeout())
            .context("failed to build HTTP client")?,
    );
    let cycle = PollCycle::new(state.clone(), source.clone(), bus.clone(), config.poll.cutoff());
    let poller = Arc::new(PollService::new(cycle, config.poll.interval()));

    let commands = CommandLoop::new(state.clone(), source, bus.clone())
        .with_poll_trigger(poller.trigger_handle())
        .with_admin_users(config.channels.telegram.admin_users.clone());

    // 4. Channels
    #[allow(unused_mut)]
    let mut channel_manager = ChannelManager::new(bus.clone());

    #[cfg(feature = "telegram")]
    {
        let tg = &config.channels.telegram;
        if tg.is_configured() {
            use feedbot_channels::telegram::TelegramChannel;
            let telegram = TelegramChannel::new(&tg.token, bus.clone(), tg.allowed_users.clone());
            channel_manager.register(Arc::new(telegram));
        } else {
            warn!("telegram token not configured");
        }
    }

    info!(
        location = %state.location(),
        feeds,
        chats,
        keys,
        channels = ?channel_manager.channel_names(),
        "gateway starting"
    );

    println!("  State:     {}", state.location());
    println!("  Feeds:     {feeds} ({chats} chats, {keys} seen articles)");
    println!("  Interval:  every {}s", config.poll.interval().as_secs());
    println!("  Channels:  {} registered", channel_manager.len());
    println!();

    if channel_manager.is_empty() {
        println!("  ⚠  No channels registered. Feeds will be polled but");
        println!("     nothing can be delivered or received.");
        println!("     Set TELEGRAM_TOKEN or channels.telegram.token in ~/.feedbot/config.json");
        println!();
    }

    println!("  Ctrl+C to stop");
    println!();

    // 5. Run
    let poll_task = {
        let poller = poller.clone();
        tokio::spawn(async move {
            if let Err(e) = poller.start().await {
                error!(error = %e, "poll service error");
            }
        })
    };

    tokio::select! {
        _ = commands.run() => {
            info!("command loop exited");
        }
        result = channel_manager.start_all() => {
            if let Err(e) = result {
                error!(error = %e, "channel manager error");
            }
        }
        _ = shutdown_signal() => {
            println!();
            println!("  Shutting down...");
            info!("received shutdown signal");
        }
    }

    // The dispatcher keeps draining while an in-flight cycle finishes.
    poller.stop();
    wait_for_poller(poll_task, POLL_DRAIN_TIMEOUT).await;
    channel_manager.stop_all().await;

    if let Err(e) = state.persist().await {
        error!(error = %e, "failed to persist state at shutdown");
    }

    println!("  Gateway stopped. Goodbye!");
    Ok(())
}

/// Wait up to `limit` for the poll task to finish. Past that it is aborted
/// and awaited, so nothing it does can race the shutdown persist.
///
/// Returns whether the task finished on its own.
async fn wait_for_poller(mut poll_task: JoinHandle<()>, limit: Duration) -> bool {
    if tokio::time::timeout(limit, &mut poll_task).await.is_ok() {
        return true;
    }
    warn!("poll cycle still running at shutdown, aborting it");
    poll_task.abort();
    let _ = poll_task.await;
    false
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
