//! Text helpers shared by the sinks and the report formatters.

/// Strip characters the downstream classifiers reject: unpaired-surrogate
/// replacement artifacts and control characters other than whitespace.
pub fn clean_for_sink(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if *c == '\u{FFFD}' {
                return false;
            }
            !c.is_control() || *c == '\n' || *c == '\r' || *c == '\t'
        })
        .collect()
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Render an integer with thousands separators, e.g. 1234567 -> "1,234,567".
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_replacement_and_controls() {
        let dirty = "hello\u{FFFD} world\u{0007}\nnext\tline";
        assert_eq!(clean_for_sink(dirty), "hello world\nnext\tline");
    }

    #[test]
    fn test_clean_keeps_emoji() {
        let text = "chips 🚀 and energy";
        assert_eq!(clean_for_sink(text), text);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 10), "ab");
        // multi-byte chars count as one
        assert_eq!(truncate_chars("日本語テスト", 3), "日本語");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
