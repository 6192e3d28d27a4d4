//! `feeds.yaml` configuration. `Config` mirrors the on-disk YAML shape
//! verbatim (all keys optional); `Config::parse` resolves it into a
//! `ParsedConfig` with every default applied, following the same
//! two-struct split the original implementation used.

use serde::Deserialize;

fn default_bloom_filter_size() -> usize {
    1_000_000
}
fn default_bloom_filter_fp_rate() -> f64 {
    0.001
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NonOpmlBlogrollSource {
    pub url: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub settings: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub feed_urls: Vec<String>,
    #[serde(default)]
    pub non_opml_blogroll_urls: Vec<NonOpmlBlogrollSource>,
    #[serde(default)]
    pub private_blocks_file: Option<String>,
    #[serde(default)]
    pub block_words: Vec<String>,
    #[serde(default)]
    pub block_domains: Vec<String>,
    #[serde(default)]
    pub block_posts: Vec<String>,
    pub post_age_limit_days: Option<i64>,
    pub max_posts_per_feed: Option<usize>,
    pub max_posts: Option<usize>,
    #[serde(default)]
    pub output_mode: Option<Vec<String>>,
    pub reading_folder_name: Option<String>,
    pub following_folder_name: Option<String>,
    pub discover_folder_name: Option<String>,
    pub network_folder_name: Option<String>,
    pub blogroll_folder_name: Option<String>,
    pub remove_old_content: Option<bool>,
    pub discover_depth: Option<u32>,
    pub post_collection_depth: Option<u32>,
    pub crawl_threads: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub http_dial_timeout_ms: Option<u64>,
    pub http_tls_timeout_ms: Option<u64>,
    pub http_response_header_timeout_ms: Option<u64>,
    pub http_proxy_url: Option<String>,
    #[serde(default)]
    pub http_only_hosts: Vec<String>,
    #[serde(default = "default_bloom_filter_size")]
    pub bloom_filter_size: usize,
    #[serde(default = "default_bloom_filter_fp_rate")]
    pub bloom_filter_fp_rate: f64,
    pub response_cache_dir: Option<String>,
}

/// A block list loaded from `private_blocks_file`, merged on top of the
/// inline block_words/block_domains/block_posts.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PrivateBlocks {
    #[serde(default)]
    pub block_words: Vec<String>,
    #[serde(default)]
    pub block_domains: Vec<String>,
    #[serde(default)]
    pub block_posts: Vec<String>,
}

/// `Config` with every default resolved, ready to drive the crawl.
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub feed_urls: Vec<String>,
    pub non_opml_blogroll_urls: Vec<NonOpmlBlogrollSource>,

    pub block_words: Vec<String>,
    pub block_domains: Vec<String>,
    pub block_posts: Vec<String>,

    pub post_age_limit_days: i64,
    pub max_posts_per_feed: usize,
    pub max_posts: usize,

    pub output_mode: Vec<String>,
    pub reading_folder_name: String,
    pub following_folder_name: String,
    pub discover_folder_name: String,
    pub network_folder_name: String,
    pub blogroll_folder_name: String,
    pub remove_old_content: bool,

    pub discover_depth: u32,
    pub post_collection_depth: u32,

    pub crawl_threads: usize,
    pub request_timeout_ms: Option<u64>,
    pub http_dial_timeout_ms: Option<u64>,
    pub http_tls_timeout_ms: Option<u64>,
    pub http_response_header_timeout_ms: Option<u64>,
    pub http_proxy_url: Option<String>,
    pub http_only_hosts: Vec<String>,

    pub bloom_filter_size: usize,
    pub bloom_filter_fp_rate: f64,
    pub response_cache_dir: Option<String>,
}

impl Config {
    pub fn parse(self) -> ParsedConfig {
        ParsedConfig {
            feed_urls: self.feed_urls,
            non_opml_blogroll_urls: self.non_opml_blogroll_urls,

            block_words: self.block_words,
            block_domains: self.block_domains,
            block_posts: self.block_posts,

            post_age_limit_days: self.post_age_limit_days.unwrap_or(36_500),
            max_posts_per_feed: self.max_posts_per_feed.unwrap_or(100),
            max_posts: self.max_posts.unwrap_or(1_000),

            output_mode: self.output_mode.unwrap_or_else(|| vec!["HugoContent".to_string()]),
            reading_folder_name: self.reading_folder_name.unwrap_or_else(|| "content/reading".to_string()),
            following_folder_name: self.following_folder_name.unwrap_or_else(|| "content/following".to_string()),
            discover_folder_name: self.discover_folder_name.unwrap_or_else(|| "content/discover".to_string()),
            network_folder_name: self.network_folder_name.unwrap_or_else(|| "content/network".to_string()),
            blogroll_folder_name: self.blogroll_folder_name.unwrap_or_else(|| "content/blogroll".to_string()),
            remove_old_content: self.remove_old_content.unwrap_or(true),

            discover_depth: self.discover_depth.unwrap_or(4),
            post_collection_depth: self.post_collection_depth.unwrap_or(2),

            crawl_threads: self.crawl_threads.unwrap_or(8),
            request_timeout_ms: self.request_timeout_ms,
            http_dial_timeout_ms: self.http_dial_timeout_ms,
            http_tls_timeout_ms: self.http_tls_timeout_ms,
            http_response_header_timeout_ms: self.http_response_header_timeout_ms,
            http_proxy_url: self.http_proxy_url,
            http_only_hosts: self.http_only_hosts,

            bloom_filter_size: self.bloom_filter_size,
            bloom_filter_fp_rate: self.bloom_filter_fp_rate,
            response_cache_dir: self.response_cache_dir,
        }
    }
}

impl ParsedConfig {
    /// Merge a `private_blocks_file`'s contents into the filter inputs.
    pub fn merge_private_blocks(&mut self, private: PrivateBlocks) {
        self.block_words.extend(private.block_words);
        self.block_domains.extend(private.block_domains);
        self.block_posts.extend(private.block_posts);
    }

    pub fn filter_policy(&self) -> crate::filter::FilterPolicy {
        crate::filter::FilterPolicy::new(
            self.block_words.clone(),
            self.block_domains.clone(),
            self.block_posts.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let raw: Config = serde_yaml::from_str("feed_urls:\n  - https://example.com/feed.xml\n").unwrap();
        let parsed = raw.parse();
        assert_eq!(parsed.post_age_limit_days, 36_500);
        assert_eq!(parsed.max_posts, 1_000);
        assert_eq!(parsed.max_posts_per_feed, 100);
        assert_eq!(parsed.discover_depth, 4);
        assert_eq!(parsed.post_collection_depth, 2);
        assert_eq!(parsed.crawl_threads, 8);
        assert_eq!(parsed.output_mode, vec!["HugoContent".to_string()]);
        assert!(parsed.remove_old_content);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let yaml = r#"
feed_urls: ["https://example.com/feed.xml"]
discover_depth: 2
output_mode: ["SQL"]
crawl_threads: 16
"#;
        let raw: Config = serde_yaml::from_str(yaml).unwrap();
        let parsed = raw.parse();
        assert_eq!(parsed.discover_depth, 2);
        assert_eq!(parsed.output_mode, vec!["SQL".to_string()]);
        assert_eq!(parsed.crawl_threads, 16);
    }
}
