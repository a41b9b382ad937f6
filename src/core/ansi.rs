//! ANSI escape stripping for text messages

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// CSI sequences: `ESC [`, parameter bytes, final letter
static CSI_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("CSI pattern is valid")
});

/// Remove terminal color and cursor sequences from `text`
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    CSI_SEQUENCE.replace_all(text, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_color_codes() {
        assert_eq!(strip_ansi("\x1b[7;1mHELLO\x1b[0m WORLD"), "HELLO WORLD");
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_strips_cursor_sequences() {
        assert_eq!(strip_ansi("\x1b[2Kdone\x1b[?25h"), "done");
    }
}
