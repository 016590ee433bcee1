//! `feedbot onboard`: write a default config and create the state directory.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use feedbot_core::config::{get_config_path, save_config, Config, StorageBackend};
use feedbot_core::utils::expand_home;

use crate::helpers::display_path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "📰 Feedbot — Setup".cyan().bold());
    println!();

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    let (config, created) = ensure_config(&config_path)?;
    let what = if created {
        "created config at"
    } else {
        "config already exists at"
    };
    println!("  {} {what} {}", "✓".green(), display_path(&config_path));

    if config.storage.backend == StorageBackend::File {
        let dir = expand_home(&config.storage.dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        println!("  {} state dir at {}", "✓".green(), display_path(&dir));
    }

    println!();
    println!(
        "  Next: set {} (or channels.telegram.token) and run {}",
        "TELEGRAM_TOKEN".bold(),
        "feedbot gateway".bold()
    );
    println!();
    Ok(())
}

/// Load the config at `path`, writing defaults first if it does not exist.
///
/// Written from defaults, never from the environment, so tokens stay out
/// of the file. Returns whether the file was created.
fn ensure_config(path: &Path) -> Result<(Config, bool)> {
    if path.exists() {
        return Ok((feedbot_core::config::load_config(Some(path)), false));
    }
    let config = Config::default();
    save_config(&config, Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok((config, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn onboard_writes_default_config_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg").join("config.json");

        let (_, created) = ensure_config(&path).unwrap();
        assert!(created);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"intervalSecs\": 900"));

        std::fs::write(&path, written.replace("900", "60")).unwrap();
        let (config, created) = ensure_config(&path).unwrap();
        assert!(!created);
        assert_eq!(config.poll.interval_secs, 60);
        let kept = std::fs::read_to_string(&path).unwrap();
        assert!(kept.contains("\"intervalSecs\": 60"));
    }
}
