//! Block-word / block-domain / block-post membership tests applied before
//! any Feed, Post, or Link is persisted.

use std::collections::HashSet;

use url::Url;

#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    pub block_words: Vec<String>,
    pub block_domains: Vec<String>,
    pub block_posts: HashSet<String>,
}

impl FilterPolicy {
    pub fn new(block_words: Vec<String>, block_domains: Vec<String>, block_posts: Vec<String>) -> Self {
        Self {
            block_words,
            block_domains: block_domains.into_iter().map(|d| d.to_lowercase()).collect(),
            block_posts: block_posts.into_iter().collect(),
        }
    }

    pub fn merge(&mut self, other: FilterPolicy) {
        self.block_words.extend(other.block_words);
        self.block_domains.extend(other.block_domains);
        self.block_posts.extend(other.block_posts);
    }

    /// Case-sensitive substring match of any configured block word.
    pub fn has_block_words(&self, text: &str) -> bool {
        self.block_words.iter().any(|w| !w.is_empty() && text.contains(w.as_str()))
    }

    /// True if the URL's host equals, or is a subdomain of, a blocked domain.
    pub fn is_blocked_domain(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.block_domains.iter().any(|domain| {
            host == *domain || host.ends_with(&format!(".{domain}"))
        })
    }

    /// True if any of link/title/id is present in the block-post set.
    pub fn is_blocked_post(&self, link: &str, title: &str, id: &str) -> bool {
        self.block_posts.contains(link) || self.block_posts.contains(title) || self.block_posts.contains(id)
    }
}
