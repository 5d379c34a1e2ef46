//! String utilities for the domain layer.

/// One-line preview of message text for log output.
///
/// Collapses every run of whitespace (including newlines) into a single
/// space and cuts the result to `max_chars` characters, appending `…`
/// when anything was dropped. Counts characters, not bytes, so multi-byte
/// text is never split.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let kept: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn test_preview_collapses_whitespace() {
        assert_eq!(preview("a\n\n  b\tc", 20), "a b c");
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("hello world", 6), "hello…");
        assert_eq!(preview("日本語テキスト", 4), "日本語…");
    }

    #[test]
    fn test_preview_zero_width() {
        assert_eq!(preview("abc", 0), "…");
    }
}
