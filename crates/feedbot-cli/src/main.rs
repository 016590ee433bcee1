//! Feedbot CLI: entry point.
//!
//! # Commands
//!
//! - `feedbot onboard`: write a default config
//! - `feedbot gateway [--logs]`: run the bot until Ctrl+C / SIGTERM
//! - `feedbot status`: show configuration and saved state
//! - `feedbot feeds [--chat ID]`: list saved subscriptions
//! - `feedbot poll [--dry-run]`: run one poll cycle and print what it would send

mod feeds_cmd;
mod gateway;
mod helpers;
mod onboard;
mod poll_cmd;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use feedbot_core::config::{load_config, LogFormat, LoggingConfig};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Feedbot: RSS/Atom subscriptions delivered to Telegram chats
#[derive(Parser)]
#[command(name = "feedbot", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.feedbot/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the state directory
    Onboard,

    /// Start the bot (Telegram, command loop, poller)
    Gateway {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and saved state
    Status,

    /// List saved subscriptions
    Feeds {
        /// Only feeds this chat subscribes to
        #[arg(long)]
        chat: Option<i64>,
    },

    /// Run one poll cycle and print the messages it produces
    Poll {
        /// Do not save the updated seen sets
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Onboard => onboard::run(cli.config.as_deref()),
        Commands::Gateway { logs } => {
            init_logging(&config.logging, logs);
            gateway::run(config).await
        }
        Commands::Status => status::run(&config, cli.config.as_deref()).await,
        Commands::Feeds { chat } => feeds_cmd::run(&config, chat).await,
        Commands::Poll { dry_run, logs } => {
            init_logging(&config.logging, logs);
            poll_cmd::run(&config, dry_run).await
        }
    }
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over the configured level; `verbose` wins over both.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("feedbot=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.compact().init(),
    }
}
