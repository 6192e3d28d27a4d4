//! Stable identifier construction, ported from the original feed2pages
//! utility functions (md5Hex / buildSafeId / buildSafePostId / buildLinkId).

pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

fn is_safe_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// An id is "unsafe" if it's too short to be meaningfully unique, contains
/// characters outside [A-Za-z0-9-], or is implausibly long.
fn is_unsafe_id(id: &str) -> bool {
    id.len() > 35 || id.chars().any(|c| !is_safe_id_char(c))
}

/// buildSafeId(id, link): replace short ids with md5(link), and
/// non-alphanumeric-dash or over-long ids with md5(id) itself.
pub fn build_safe_id(id: &str, link: &str) -> String {
    if id.len() < 8 {
        md5_hex(link)
    } else if is_unsafe_id(id) {
        md5_hex(id)
    } else {
        id.to_string()
    }
}

/// Feed id: md5(feed_url).
pub fn feed_id(feed_link: &str) -> String {
    md5_hex(feed_link)
}

/// Post id: md5(guid + " " + feed_link), always — never passed through
/// build_safe_id, so that the same guid under two feeds yields distinct ids.
pub fn post_id(guid: &str, feed_link: &str) -> String {
    md5_hex(&format!("{} {}", guid, feed_link))
}

/// Link id: md5(source_url + "\n" + dest_url).
pub fn link_id(source_url: &str, dest_url: &str) -> String {
    md5_hex(&format!("{}\n{}", source_url, dest_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_id_is_md5_of_link() {
        let link = "https://example.com/feed.xml";
        assert_eq!(feed_id(link), md5_hex(link));
    }

    #[test]
    fn post_id_differs_across_feeds_for_same_guid() {
        let a = post_id("guid-1", "https://a.example/feed.xml");
        let b = post_id("guid-1", "https://b.example/feed.xml");
        assert_ne!(a, b);
    }

    #[test]
    fn short_id_falls_back_to_link_hash() {
        let id = build_safe_id("abc", "https://example.com/x");
        assert_eq!(id, md5_hex("https://example.com/x"));
    }

    #[test]
    fn unsafe_chars_fall_back_to_id_hash() {
        let weird = "not a valid guid!!";
        let id = build_safe_id(weird, "https://example.com/x");
        assert_eq!(id, md5_hex(weird));
    }

    #[test]
    fn over_long_id_falls_back_to_id_hash() {
        let long_id = "a".repeat(36);
        let id = build_safe_id(&long_id, "https://example.com/x");
        assert_eq!(id, md5_hex(&long_id));
    }

    #[test]
    fn well_formed_id_passes_through() {
        let id = build_safe_id("abcdefgh-1234", "https://example.com/x");
        assert_eq!(id, "abcdefgh-1234");
    }
}
