//! Shared text helpers.

/// Maximum length, in characters, of a Discord message body.
pub const MESSAGE_CONTENT_LIMIT: usize = 2000;

/// Truncates `input` to at most `max_chars` characters, ending with an
/// ellipsis when anything was cut. Never splits a UTF-8 code point.
pub fn truncate_content(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = input.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Escapes Discord markdown control characters so user-provided text renders
/// literally.
pub fn escape_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '_' | '`' | '~' | '|' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content() {
        let input = "This is a very long string that should be truncated";
        assert_eq!(truncate_content(input, 20), "This is a very lo...");
        assert_eq!(truncate_content("Short", 20), "Short");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let input = "ééééééééééé";
        let truncated = truncate_content(input, 5);
        assert_eq!(truncated, "éé...");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("**bold** `x`"), r"\*\*bold\*\* \`x\`");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}
