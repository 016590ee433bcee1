//! Shared CLI helpers: state loading, path display, banner.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use feedbot_core::config::Config;
use feedbot_feeds::{build_storage, FeedState};

/// Build the configured storage backend and restore state from it.
pub async fn open_state(config: &Config) -> Result<Arc<FeedState>> {
    let storage = build_storage(&config.storage, config.poll.request_timeout())
        .context("failed to build storage backend")?;
    Ok(Arc::new(FeedState::restore(storage, &config.storage.key).await))
}

/// Show a path with the home directory abbreviated to `~`.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs_next::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "📰 Feedbot".cyan().bold(), version.dimmed());
    println!();
}

pub fn check_mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
