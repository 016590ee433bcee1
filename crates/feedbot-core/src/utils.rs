//! Utility helpers: path resolution and sender matching.

use std::path::PathBuf;

/// Get the Feedbot data directory (e.g. `~/.feedbot/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".feedbot")
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

/// Whether a sender matches an allow-list.
///
/// Sender ID format: `"user_id|username"`; either part matches.
/// An empty list matches everyone.
pub fn sender_matches(sender_id: &str, list: &[String]) -> bool {
    if list.is_empty() {
        return true;
    }

    if list.iter().any(|u| u == sender_id) {
        return true;
    }

    sender_id
        .split('|')
        .any(|part| !part.is_empty() && list.iter().any(|u| u == part))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_data_path_ends_with_feedbot() {
        assert!(get_data_path().ends_with(".feedbot"));
    }

    #[test]
    fn test_expand_home() {
        let p = expand_home("~/state");
        assert!(p.ends_with("state"));
        assert!(!p.to_string_lossy().starts_with('~'));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("relative"), PathBuf::from("relative"));
    }

    #[test]
    fn test_sender_matches_empty_list() {
        assert!(sender_matches("1|anyone", &[]));
    }

    #[test]
    fn test_sender_matches_by_id_or_username() {
        let admins = list(&["123456", "johndoe"]);
        assert!(sender_matches("123456|someuser", &admins));
        assert!(sender_matches("999999|johndoe", &admins));
        assert!(sender_matches("123456", &admins));
        assert!(!sender_matches("999999|stranger", &admins));
    }

    #[test]
    fn test_sender_matches_ignores_empty_username() {
        let admins = list(&["alice"]);
        assert!(!sender_matches("5|", &admins));
    }
}
