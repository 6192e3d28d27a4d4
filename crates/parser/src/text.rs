//! Truncation and readability extraction, the two "text hygiene" steps
//! applied to every title/description/content field before persistence.

const TRUNCATE_BREAK_CHARS: &str = " .,:;-";

/// Truncate `s` to at most `max` characters, preferring to break at the
/// last occurrence of a word/sentence boundary within the budget. Falls
/// back to a hard cut at `max` when no boundary exists.
pub fn truncate_text(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max {
        return s.to_string();
    }
    let window = &chars[..max];
    let cut = window
        .iter()
        .rposition(|c| TRUNCATE_BREAK_CHARS.contains(*c))
        .unwrap_or(max);
    chars[..cut].iter().collect()
}

/// Strip HTML down to plain text via the readability-style extractor.
/// Falls back to the raw input on render failure.
pub fn to_plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), usize::MAX)
        .unwrap_or_else(|_| html.to_string())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn process_title(raw: &str) -> String {
    truncate_text(raw.trim(), 200)
}

pub fn process_description(raw_html: &str) -> String {
    truncate_text(to_plain_text(raw_html).trim(), 200)
}

pub fn process_content(raw_html: &str) -> String {
    truncate_text(to_plain_text(raw_html).trim(), 300)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_text("hello", 200), "hello");
    }

    #[test]
    fn truncates_at_last_boundary_within_budget() {
        let s = "one two three four five";
        let truncated = truncate_text(s, 13);
        assert_eq!(truncated, "one two");
    }

    #[test]
    fn falls_back_to_hard_cut_when_no_boundary() {
        let s = "abcdefghijklmnopqrstuvwxyz";
        let truncated = truncate_text(s, 10);
        assert_eq!(truncated, "abcdefghij");
    }

    #[test]
    fn truncation_never_exceeds_budget_and_is_a_prefix() {
        let s = "the quick brown fox jumps over the lazy dog repeatedly and then some more";
        for max in [1, 5, 10, 20, 50] {
            let truncated = truncate_text(s, max);
            assert!(truncated.chars().count() <= max);
            assert!(s.starts_with(&truncated));
        }
    }

    #[test]
    fn html_is_stripped_to_plain_text() {
        let html = "<p>Hello <b>world</b></p>";
        let plain = to_plain_text(html);
        assert!(plain.contains("Hello"));
        assert!(!plain.contains('<'));
    }
}
