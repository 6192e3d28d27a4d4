//! BCP-47 language tag normalization. Tags are inherited down the document
//! tree (feed -> entry) and reduced to their primary subtag before
//! persistence.

/// Normalize a BCP-47 tag to its primary subtag, lowercased (e.g.
/// "en-US" -> "en", "PT-br" -> "pt"). Returns `None` for empty input.
pub fn primary_subtag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .split(['-', '_'])
        .next()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Resolve an entry's language: its own tag, else inherited content, else
/// the feed's language.
pub fn resolve(entry_lang: Option<&str>, inherited: Option<&str>, feed_lang: Option<&str>) -> Option<String> {
    entry_lang
        .and_then(primary_subtag)
        .or_else(|| inherited.and_then(primary_subtag))
        .or_else(|| feed_lang.and_then(primary_subtag))
}
