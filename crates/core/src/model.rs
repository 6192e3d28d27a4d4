use serde::{Deserialize, Serialize};
use url::Url;

/// Tag on every graph endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Seed,
    Feed,
    Website,
    Blogroll,
    Canonical,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Seed => "seed",
            NodeType::Feed => "feed",
            NodeType::Website => "website",
            NodeType::Blogroll => "blogroll",
            NodeType::Canonical => "canonical",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag describing the provenance of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LinkType {
    RelMe,
    RelBlogroll,
    RelAlternate,
    RelCanonical,
    FromFeed,
    FromOpml,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::RelMe => "RelMe",
            LinkType::RelBlogroll => "RelBlogroll",
            LinkType::RelAlternate => "RelAlternate",
            LinkType::RelCanonical => "RelCanonical",
            LinkType::FromFeed => "FromFeed",
            LinkType::FromOpml => "FromOpml",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a feed was reached within the direct-recommendation depth band
/// or only transitively (discover-depth band). Governs persistence routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Direct,
    Discover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Rss,
    Atom,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Rss => "rss",
            FeedType::Atom => "atom",
        }
    }
}

/// A syndication feed, keyed by its canonical feed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: String,
    pub feed_link: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub feed_type: FeedType,
    pub is_podcast: bool,
    pub is_no_archive: bool,
    pub link: String,
    pub categories: Vec<String>,
    pub language: Option<String>,
    pub blogrolls: Vec<String>,
    pub post_count: u64,
    pub avg_post_length: u64,
    pub avg_posts_per_day: f64,
    #[serde(skip)]
    pub classification: Classification,
}

impl Default for Classification {
    fn default() -> Self {
        Classification::Direct
    }
}

/// A single syndicated article, keyed by md5(guid + " " + feed_link).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub feed_id: String,
    pub feed_link: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub date: String,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub link: String,
}

/// A directed edge between two graph endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub source_type: NodeType,
    pub source_url: String,
    pub dest_type: NodeType,
    pub dest_url: String,
    pub link_type: LinkType,
}

impl Link {
    /// Composite key this record is unique on: (source-type, source-url, dest-type, dest-url).
    pub fn composite_key(&self) -> String {
        format!(
            "{}\u{1}{}\u{1}{}\u{1}{}",
            self.source_type, self.source_url, self.dest_type, self.dest_url
        )
    }
}

/// Provenance context carried by a discovery request: who recommended this URL and how.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub url: String,
    pub node_type: NodeType,
    pub link_type: LinkType,
}

/// A single outbound crawl candidate: a destination URL plus the context it
/// was discovered under. Produced by handlers, consumed by the frontier's
/// admission filter.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub dest_url: Url,
    pub dest_type: NodeType,
    pub depth: u32,
    pub source: Option<SourceContext>,
}

impl DiscoveryRequest {
    pub fn seed(url: Url) -> Self {
        Self {
            dest_url: url,
            dest_type: NodeType::Seed,
            depth: 0,
            source: None,
        }
    }

    pub fn child(dest_url: Url, dest_type: NodeType, depth: u32, source: SourceContext) -> Self {
        Self {
            dest_url,
            dest_type,
            depth,
            source: Some(source),
        }
    }
}

/// A fetched, not-yet-parsed HTTP response, handed from the scheduler to the dispatcher.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub headers: std::collections::HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Trim, drop empties, dedup, and sort -- the category hygiene every Feed's
/// category list must satisfy before persistence.
pub fn normalize_categories(categories: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_categories_sorts_dedups_and_drops_empty() {
        let input = vec!["b".to_string(), " ".to_string(), "a".to_string(), "b".to_string(), "".to_string()];
        assert_eq!(normalize_categories(input), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn link_composite_key_distinguishes_by_all_four_fields() {
        let a = Link {
            id: "1".into(),
            source_type: NodeType::Feed,
            source_url: "https://a".into(),
            dest_type: NodeType::Website,
            dest_url: "https://b".into(),
            link_type: LinkType::FromFeed,
        };
        let mut c = a.clone();
        c.dest_url = "https://c".into();
        assert_ne!(a.composite_key(), c.composite_key());
    }
}
