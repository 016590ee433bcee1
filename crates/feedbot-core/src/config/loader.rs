//! Config loader: reads `~/.feedbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.feedbot/config.json`
//! 3. Legacy deployment variables (`TELEGRAM_TOKEN`, `BUCKET`, `LOG_LEVEL`, `LOG_FORMAT`)
//! 4. Environment variables `FEEDBOT_<SECTION>__<FIELD>`

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, LogFormat, StorageBackend, MAX_CUTOFF_HOURS};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    let config = load_config_from_path(&config_path);
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment overrides on top of a loaded config.
///
/// `lookup` resolves a variable name to its value.
///
/// Supported overrides:
/// - `TELEGRAM_TOKEN`, `FEEDBOT_CHANNELS__TELEGRAM__TOKEN` → `channels.telegram.token`
/// - `FEEDBOT_CHANNELS__TELEGRAM__ADMIN_USERS` (comma separated) → `channels.telegram.admin_users`
/// - `BUCKET`, `FEEDBOT_STORAGE__BUCKET` → `storage.bucket` (selects the gcs backend)
/// - `FEEDBOT_STORAGE__BACKEND`, `__DIR`, `__KEY`, `__API_BASE`, `__ACCESS_TOKEN`, `__ANONYMOUS`
/// - `FEEDBOT_POLL__INTERVAL_SECS`, `__CUTOFF_HOURS`, `__QUEUE_CAPACITY`, `__REQUEST_TIMEOUT_SECS`
/// - `LOG_LEVEL`, `FEEDBOT_LOGGING__LEVEL` → `logging.level`
/// - `LOG_FORMAT`, `FEEDBOT_LOGGING__FORMAT` → `logging.format`
fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    // Legacy names first; namespaced ones win.
    if let Some(val) = var("TELEGRAM_TOKEN") {
        config.channels.telegram.token = val;
    }
    if let Some(val) = var("BUCKET") {
        config.storage.bucket = val;
        config.storage.backend = StorageBackend::Gcs;
    }
    if let Some(val) = var("LOG_LEVEL") {
        config.logging.level = val.to_lowercase();
    }
    if let Some(val) = var("LOG_FORMAT") {
        config.logging.format = parse_log_format(&val);
    }

    // Channels
    if let Some(val) = var("FEEDBOT_CHANNELS__TELEGRAM__TOKEN") {
        config.channels.telegram.token = val;
    }
    if let Some(val) = var("FEEDBOT_CHANNELS__TELEGRAM__ALLOWED_USERS") {
        config.channels.telegram.allowed_users = split_list(&val);
    }
    if let Some(val) = var("FEEDBOT_CHANNELS__TELEGRAM__ADMIN_USERS") {
        config.channels.telegram.admin_users = split_list(&val);
    }

    // Poll
    if let Some(n) = var("FEEDBOT_POLL__INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.poll.interval_secs = n;
    }
    if let Some(n) = var("FEEDBOT_POLL__CUTOFF_HOURS").and_then(|v| v.parse().ok()) {
        config.poll.cutoff_hours = n;
    }
    if let Some(n) = var("FEEDBOT_POLL__QUEUE_CAPACITY").and_then(|v| v.parse().ok()) {
        config.poll.queue_capacity = n;
    }
    if let Some(n) = var("FEEDBOT_POLL__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.poll.request_timeout_secs = n;
    }

    // Storage
    if let Some(val) = var("FEEDBOT_STORAGE__BUCKET") {
        config.storage.bucket = val;
        config.storage.backend = StorageBackend::Gcs;
    }
    if let Some(val) = var("FEEDBOT_STORAGE__BACKEND") {
        match val.to_lowercase().as_str() {
            "file" => config.storage.backend = StorageBackend::File,
            "gcs" => config.storage.backend = StorageBackend::Gcs,
            other => warn!(backend = %other, "unknown storage backend, keeping {:?}", config.storage.backend),
        }
    }
    if let Some(val) = var("FEEDBOT_STORAGE__DIR") {
        config.storage.dir = val;
    }
    if let Some(val) = var("FEEDBOT_STORAGE__KEY") {
        config.storage.key = val;
    }
    if let Some(val) = var("FEEDBOT_STORAGE__API_BASE") {
        config.storage.api_base = val;
    }
    if let Some(val) = var("FEEDBOT_STORAGE__ACCESS_TOKEN") {
        config.storage.access_token = val;
    }
    if let Some(val) = var("FEEDBOT_STORAGE__ANONYMOUS") {
        config.storage.anonymous = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
    }

    // Logging
    if let Some(val) = var("FEEDBOT_LOGGING__LEVEL") {
        config.logging.level = val.to_lowercase();
    }
    if let Some(val) = var("FEEDBOT_LOGGING__FORMAT") {
        config.logging.format = parse_log_format(&val);
    }

    let hours = config.poll.cutoff_hours;
    if !(0..=MAX_CUTOFF_HOURS).contains(&hours) {
        let clamped = hours.clamp(0, MAX_CUTOFF_HOURS);
        warn!(cutoff_hours = hours, clamped, "poll.cutoffHours out of range");
        config.poll.cutoff_hours = clamped;
    }

    config
}

fn parse_log_format(val: &str) -> LogFormat {
    if val.eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.poll.interval_secs, 900);
        assert_eq!(config.storage.key, "rsssubsbot.json");
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "channels": { "telegram": { "token": "123:abc", "adminUsers": ["alice"] } },
            "poll": { "intervalSecs": 60 }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.channels.telegram.token, "123:abc");
        assert_eq!(config.channels.telegram.admin_users, vec!["alice"]);
        assert_eq!(config.poll.interval_secs, 60);
        // Default preserved
        assert_eq!(config.poll.cutoff_hours, 192);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.poll.queue_capacity, 16);
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.channels.telegram.token = "tok".to_string();
        config.storage.backend = StorageBackend::Gcs;
        config.storage.bucket = "my-bucket".to_string();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.channels.telegram.token, "tok");
        assert_eq!(reloaded.storage.backend, StorageBackend::Gcs);
        assert_eq!(reloaded.storage.bucket, "my-bucket");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["poll"].get("intervalSecs").is_some());
        assert!(raw["poll"].get("interval_secs").is_none());
    }

    #[test]
    fn test_legacy_env_names() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                ("TELEGRAM_TOKEN", "legacy-token"),
                ("BUCKET", "legacy-bucket"),
                ("LOG_LEVEL", "DEBUG"),
                ("LOG_FORMAT", "json"),
            ]),
        );
        assert_eq!(config.channels.telegram.token, "legacy-token");
        assert_eq!(config.storage.bucket, "legacy-bucket");
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_namespaced_env_wins_over_legacy() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                ("TELEGRAM_TOKEN", "legacy"),
                ("FEEDBOT_CHANNELS__TELEGRAM__TOKEN", "namespaced"),
            ]),
        );
        assert_eq!(config.channels.telegram.token, "namespaced");
    }

    #[test]
    fn test_env_poll_and_lists() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                ("FEEDBOT_POLL__INTERVAL_SECS", "120"),
                ("FEEDBOT_POLL__CUTOFF_HOURS", "not-a-number"),
                ("FEEDBOT_CHANNELS__TELEGRAM__ADMIN_USERS", "alice, 42 ,,"),
                ("FEEDBOT_STORAGE__BACKEND", "FILE"),
            ]),
        );
        assert_eq!(config.poll.interval_secs, 120);
        assert_eq!(config.poll.cutoff_hours, 192);
        assert_eq!(config.channels.telegram.admin_users, vec!["alice", "42"]);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_cutoff_hours_clamped_on_load() {
        let huge = i64::MAX.to_string();
        let config = apply_env_overrides(
            Config::default(),
            env(&[("FEEDBOT_POLL__CUTOFF_HOURS", huge.as_str())]),
        );
        assert_eq!(config.poll.cutoff_hours, MAX_CUTOFF_HOURS);

        let config = apply_env_overrides(
            Config::default(),
            env(&[("FEEDBOT_POLL__CUTOFF_HOURS", "-1")]),
        );
        assert_eq!(config.poll.cutoff_hours, 0);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let config = apply_env_overrides(Config::default(), env(&[("TELEGRAM_TOKEN", "")]));
        assert!(config.channels.telegram.token.is_empty());
    }
}
