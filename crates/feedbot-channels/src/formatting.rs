//! Text helpers for transports with a message length limit.

/// Split text into chunks of at most `max_len` bytes.
///
/// Prefers to break at the last newline before the limit (the newline is
/// dropped); otherwise breaks at the last char boundary that fits.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len || max_len == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            // A single char wider than max_len.
            limit = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }

        let split_at = match remaining[..limit].rfind('\n') {
            Some(0) | None => limit,
            Some(i) => i,
        };

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest.strip_prefix('\n').unwrap_or(rest);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
        assert_eq!(split_message("", 10), vec![""]);
    }

    #[test]
    fn test_split_at_newline() {
        let text = "line one\nline two\nline three";
        let chunks = split_message(text, 18);
        assert_eq!(chunks, vec!["line one\nline two", "line three"]);
    }

    #[test]
    fn test_hard_split_without_newline() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_multibyte_never_split_inside_char() {
        let text = "ééééé"; // 2 bytes each
        let chunks = split_message(text, 3);
        assert_eq!(chunks, vec!["é", "é", "é", "é", "é"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_leading_newline_does_not_stall() {
        let chunks = split_message("\nabcdef", 4);
        assert_eq!(chunks.concat(), "\nabcdef");
        assert!(chunks.iter().all(|c| c.len() <= 4));
    }

    #[test]
    fn test_telegram_limit() {
        let text = "x".repeat(10_000);
        let chunks = split_message(&text, 4096);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 4096));
    }
}
