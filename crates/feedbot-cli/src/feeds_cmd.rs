//! `feedbot feeds`: list saved subscriptions.

use anyhow::Result;
use colored::Colorize;

use feedbot_core::config::Config;
use feedbot_core::ChatId;
use feedbot_feeds::Feed;

use crate::helpers::open_state;

pub async fn run(config: &Config, chat: Option<ChatId>) -> Result<()> {
    let state = open_state(config).await?;
    let feeds = state.registry.snapshot().await;
    let rows: Vec<(&String, &Feed)> = feeds
        .iter()
        .filter(|(_, feed)| chat.is_none_or(|c| feed.subscribers.contains(&c)))
        .collect();

    println!();
    if rows.is_empty() {
        println!("  {}", "No subscriptions.".dimmed());
        println!();
        return Ok(());
    }

    for (url, feed) in rows {
        println!("  {}", feed.title.bold());
        println!("    {}", url.dimmed());
        let subscribers: Vec<String> = feed.subscribers.iter().map(ChatId::to_string).collect();
        if subscribers.is_empty() {
            println!("    {}", "no subscribers".dimmed());
        } else {
            println!("    chats: {}", subscribers.join(", "));
        }
    }
    println!();

    Ok(())
}
