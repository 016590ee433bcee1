//! `feedbot status`: show configuration and saved state.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use feedbot_core::config::{get_config_path, Config, StorageBackend};

use crate::helpers::{check_mark, display_path, open_state};

pub async fn run(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "📰 Feedbot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        display_path(&config_path),
        if config_path.exists() {
            check_mark(true)
        } else {
            "(not found, using defaults)".dimmed().to_string()
        }
    );

    let backend = match config.storage.backend {
        StorageBackend::File => format!("file ({})", config.storage.dir),
        StorageBackend::Gcs => format!("gcs (bucket: {})", config.storage.bucket),
    };
    println!("  {:<18} {}", "Storage:".bold(), backend);

    let telegram = &config.channels.telegram;
    let token_status = if telegram.is_configured() {
        format!("{} (token set)", check_mark(true))
    } else {
        format!("{}", "· not configured".dimmed())
    };
    println!("  {:<18} {}", "Telegram:".bold(), token_status);
    if !telegram.allowed_users.is_empty() {
        println!(
            "  {:<18} {}",
            "Allowed users:".bold(),
            telegram.allowed_users.join(", ")
        );
    }
    if !telegram.admin_users.is_empty() {
        println!(
            "  {:<18} {}",
            "Admin users:".bold(),
            telegram.admin_users.join(", ")
        );
    }

    println!(
        "  {:<18} every {}s, cutoff {}h, queue {}",
        "Polling:".bold(),
        config.poll.interval_secs,
        config.poll.cutoff_hours,
        config.poll.queue_capacity
    );

    println!();
    match open_state(config).await {
        Ok(state) => {
            let (feeds, chats, keys) = state.stats().await;
            println!("  {:<18} {}", "State:".bold(), state.location());
            println!("    {:<16} {}", "Feeds", feeds);
            println!("    {:<16} {}", "Chats", chats);
            println!("    {:<16} {}", "Seen articles", keys);
        }
        Err(e) => {
            println!("  {:<18} {} {e:#}", "State:".bold(), check_mark(false));
        }
    }
    println!();

    Ok(())
}
