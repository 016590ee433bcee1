//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use feedbot_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Poll every {}s", cfg.poll.interval_secs);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{
    ChannelsConfig, Config, LogFormat, LoggingConfig, PollConfig, StorageBackend, StorageConfig,
    TelegramConfig,
};
