//! `feedbot poll`: run one poll cycle from the command line.
//!
//! Messages are printed as `<chat id>\t<link>` instead of being sent.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use feedbot_core::bus::{MessageBus, OutboundMessage};
use feedbot_core::config::Config;
use feedbot_feeds::HttpFeedSource;
use feedbot_poller::PollCycle;

use crate::helpers::open_state;

pub async fn run(config: &Config, dry_run: bool) -> Result<()> {
    let state = open_state(config).await?;
    let source = Arc::new(
        HttpFeedSource::new(config.poll.request_timeout()).context("failed to build HTTP client")?,
    );
    let bus = Arc::new(MessageBus::new(config.poll.queue_capacity));

    // Stands in for the channel dispatcher so the bounded queue keeps moving.
    let printer = {
        let bus = bus.clone();
        tokio::spawn(async move {
            while let Some(msg) = bus.consume_outbound().await {
                print_message(&msg);
            }
        })
    };

    let cycle = PollCycle::new(state.clone(), source, bus.clone(), config.poll.cutoff());
    let report = cycle.run().await;

    printer.abort();
    let _ = printer.await;
    for msg in bus.drain_outbound().await {
        print_message(&msg);
    }

    eprintln!(
        "{} {} feeds, {} failed, {} new articles",
        "poll:".bold(),
        report.feeds,
        report.failed,
        report.queued
    );

    if dry_run {
        eprintln!("{}", "dry run, state not saved".dimmed());
    } else {
        state.persist().await.context("failed to persist state")?;
    }
    Ok(())
}

fn print_message(msg: &OutboundMessage) {
    println!("{}\t{}", msg.chat_id, msg.content);
}
