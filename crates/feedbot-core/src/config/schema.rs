//! Configuration schema.
//!
//! Hierarchy: `Config` → `ChannelsConfig`, `PollConfig`, `StorageConfig`,
//! `LoggingConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.feedbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub channels: ChannelsConfig,
    pub poll: PollConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

// ─────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────

/// Chat transport configurations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Telegram bot config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(default)]
    pub token: String,
    /// User ids / usernames allowed to talk to the bot. Empty = everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// User ids / usernames allowed to run `update`. Empty = everyone.
    #[serde(default)]
    pub admin_users: Vec<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

// ─────────────────────────────────────────────
// Poll
// ─────────────────────────────────────────────

/// Poll cycle settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollConfig {
    /// Seconds between scheduled poll cycles.
    pub interval_secs: u64,
    /// Age in hours past which unseen items are marked but not delivered.
    pub cutoff_hours: i64,
    /// Capacity of the delivery queue.
    pub queue_capacity: usize,
    /// Per-request timeout when fetching a feed.
    pub request_timeout_secs: u64,
}

/// Largest accepted staleness window, about a century.
pub const MAX_CUTOFF_HOURS: i64 = 100 * 365 * 24;

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Staleness window, with `cutoff_hours` clamped to `0..=MAX_CUTOFF_HOURS`.
    pub fn cutoff(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.cutoff_hours.clamp(0, MAX_CUTOFF_HOURS))
            .unwrap_or_else(chrono::Duration::zero)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            cutoff_hours: 192,
            queue_capacity: 16,
            request_timeout_secs: 30,
        }
    }
}

// ─────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────

/// Where the state document is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// A directory on the local disk.
    #[default]
    File,
    /// A Google Cloud Storage bucket.
    Gcs,
}

/// Durable storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the `file` backend (`~` is expanded).
    pub dir: String,
    /// Bucket name for the `gcs` backend.
    pub bucket: String,
    /// Object key / file name of the state document.
    pub key: String,
    /// Base URL of the object storage API.
    pub api_base: String,
    /// Fixed OAuth2 bearer token for the `gcs` backend. When empty,
    /// Application Default Credentials are used and refreshed as needed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    /// Send no credentials at all (storage emulators).
    pub anonymous: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            dir: "~/.feedbot/state".to_string(),
            bucket: String::new(),
            key: "rsssubsbot.json".to_string(),
            api_base: "https://storage.googleapis.com".to_string(),
            access_token: String::new(),
            anonymous: false,
        }
    }
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `debug`, `info`, `warn` or `error`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "error".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll.interval_secs, 900);
        assert_eq!(config.poll.cutoff_hours, 192);
        assert_eq!(config.poll.queue_capacity, 16);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.key, "rsssubsbot.json");
        assert_eq!(config.logging.level, "error");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(!config.channels.telegram.is_configured());
    }

    #[test]
    fn test_durations() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval(), Duration::from_secs(900));
        assert_eq!(poll.cutoff(), chrono::Duration::hours(192));

        let zero = PollConfig {
            interval_secs: 0,
            ..PollConfig::default()
        };
        assert_eq!(zero.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_cutoff_out_of_range_is_clamped() {
        let huge = PollConfig {
            cutoff_hours: i64::MAX,
            ..PollConfig::default()
        };
        assert_eq!(huge.cutoff(), chrono::Duration::hours(MAX_CUTOFF_HOURS));

        let negative = PollConfig {
            cutoff_hours: -5,
            ..PollConfig::default()
        };
        assert_eq!(negative.cutoff(), chrono::Duration::zero());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "poll": { "intervalSecs": 60 }, "storage": { "backend": "gcs", "bucket": "b" } }"#,
        )
        .unwrap();
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.poll.cutoff_hours, 192);
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert_eq!(config.storage.key, "rsssubsbot.json");
    }

    #[test]
    fn test_access_token_not_serialized_when_empty() {
        let raw = serde_json::to_value(StorageConfig::default()).unwrap();
        assert!(raw.get("accessToken").is_none());
        assert!(raw.get("apiBase").is_some());
    }
}
