//! Shared utility functions.
//!
//! Message length limits on chat platforms are counted in characters, not
//! bytes, so these helpers work on `char` counts while always returning
//! slices cut on valid UTF-8 boundaries.

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to at most `max_chars` characters.
///
/// Returns a sub-slice of the original string. If the string is already short
/// enough it is returned unchanged.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Byte offset at which `s` should be cut so the first part fits in one
/// message of `max_chars` characters.
///
/// Returns `s.len()` when the whole string fits. Otherwise prefers to cut just
/// after the last newline found in the final quarter of the window, falling
/// back to a hard cut at `max_chars`. The result is always greater than zero
/// for a non-empty `s`.
pub fn message_split_point(s: &str, max_chars: usize) -> usize {
    let max_chars = max_chars.max(1);
    let Some((hard, _)) = s.char_indices().nth(max_chars) else {
        return s.len();
    };

    let window_start = s
        .char_indices()
        .nth(max_chars - max_chars / 4)
        .map(|(idx, _)| idx)
        .unwrap_or(hard);

    match s[window_start..hard].rfind('\n') {
        Some(pos) => window_start + pos + 1,
        None => hard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn truncate_no_op_when_short() {
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("", 10), "");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        // Each of these is 3 bytes in UTF-8
        let s = "あのね";
        assert_eq!(truncate_chars(s, 1), "あ");
        assert_eq!(truncate_chars(s, 2), "あの");
        assert_eq!(truncate_chars(s, 3), "あのね");
        assert_eq!(char_len(s), 3);
    }

    #[test]
    fn split_whole_string_when_it_fits() {
        assert_eq!(message_split_point("short", 10), 5);
        assert_eq!(message_split_point("exact", 5), 5);
    }

    #[test]
    fn split_hard_cut_without_newline() {
        assert_eq!(message_split_point("abcdefghij", 4), 4);
    }

    #[test]
    fn split_prefers_newline_near_the_end() {
        // Window of 8 chars, last quarter starts at char 6
        let s = "abcdef\nghijkl";
        assert_eq!(message_split_point(s, 8), 7);
        assert_eq!(&s[..7], "abcdef\n");
    }

    #[test]
    fn split_ignores_early_newline() {
        let s = "ab\ncdefghijkl";
        assert_eq!(message_split_point(s, 8), 8);
    }

    #[test]
    fn split_multibyte_boundary() {
        let s = "あのねあのね";
        let cut = message_split_point(s, 4);
        assert_eq!(&s[..cut], "あのねあ");
    }

    #[test]
    fn split_zero_limit_still_makes_progress() {
        assert_eq!(message_split_point("abc", 0), 1);
    }
}
