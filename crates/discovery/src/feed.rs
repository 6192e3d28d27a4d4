//! Unified RSS/Atom handler. `feed_rs` already folds RSS 0.9x/2.0 and Atom
//! into one typed model, including the date-priority chain
//! (`updated`.or(`published`)) this spec calls for -- so RSS and Atom are
//! handled by the same extraction path, branching only where the spec
//! prescribes a different link-selection or edge-type rule per format.

use feed_rs::model::{Entry, Feed as RawFeed, FeedType as RawFeedType, Link as RawLink};
use feedmesh_core::{
    dates, ids, normalize_categories, Classification, DiscoveryRequest, FeedType, LinkType, NodeType, Post,
    SourceContext,
};
use feedmesh_parser::{process_content, process_description, process_title, resolve_language};
use tracing::warn;

use crate::context::{DispatchContext, HandlerOutput};
use crate::raw_scan;

pub fn handle(ctx: &DispatchContext, body: &[u8]) -> HandlerOutput {
    let parsed = match feed_rs::parser::parse(body) {
        Ok(f) => f,
        Err(e) => {
            warn!(url = %ctx.source_url(), error = %e, "failed to parse feed");
            return HandlerOutput::default();
        }
    };

    let feed_link = ctx.source_url();
    let raw = raw_scan::scan(body);
    let is_atom = matches!(parsed.feed_type, RawFeedType::Atom);

    let title = process_title(&parsed.title.map(|t| t.content).unwrap_or_default());
    let description = process_description(&parsed.description.map(|d| d.content).unwrap_or_default());

    if ctx.filter.has_block_words(&title) || ctx.filter.has_block_words(&description) {
        return HandlerOutput::default();
    }

    let primary_link = primary_website_link(&parsed.links, is_atom);
    if let Some(link) = primary_link.as_deref() {
        if ctx.filter.has_block_words(link) || ctx.filter.is_blocked_domain(link) {
            return HandlerOutput::default();
        }
    }

    let is_podcast = !raw.itunes_categories.is_empty();
    let categories = if is_podcast {
        normalize_categories(raw.itunes_categories.clone())
    } else {
        normalize_categories(parsed.categories.iter().map(|c| c.term.clone()).collect())
    };

    let date = parsed
        .updated
        .or(parsed.published)
        .map(|d| dates::format_utc(d))
        .unwrap_or_else(|| dates::SENTINEL.to_string());

    let classification = if ctx.depth() < 4 { Classification::Direct } else { Classification::Discover };

    let mut feed = feedmesh_core::Feed {
        id: ids::feed_id(&feed_link),
        feed_link: feed_link.clone(),
        title,
        description,
        date,
        feed_type: if is_atom { FeedType::Atom } else { FeedType::Rss },
        is_podcast,
        is_no_archive: false,
        link: primary_link.clone().unwrap_or_default(),
        categories,
        language: parsed.language.clone(),
        blogrolls: raw.blogrolls.clone(),
        post_count: 0,
        avg_post_length: 0,
        avg_posts_per_day: 0.0,
        classification,
    };

    let mut requests = Vec::new();

    if !is_atom {
        let blogroll_source = SourceContext {
            url: feed_link.clone(),
            node_type: NodeType::Feed,
            link_type: LinkType::FromFeed,
        };
        for blogroll in &raw.blogrolls {
            if let Ok(url) = url::Url::parse(blogroll) {
                requests.push(DiscoveryRequest::child(url, NodeType::Blogroll, ctx.depth() + 1, blogroll_source.clone()));
            }
        }
    }

    if raw.blogrolls.is_empty() {
        if let Some(link) = primary_link.as_deref() {
            if let Some(recommendation) = build_recommendation_url(link) {
                let source = SourceContext {
                    url: feed_link.clone(),
                    node_type: NodeType::Feed,
                    link_type: LinkType::FromFeed,
                };
                requests.push(DiscoveryRequest::child(recommendation, NodeType::Blogroll, ctx.depth() + 1, source));
            }
        }
    }

    if let Some(link) = primary_link.as_deref() {
        if let Ok(url) = url::Url::parse(link) {
            let link_type = if is_atom { LinkType::RelAlternate } else { LinkType::FromFeed };
            let source = SourceContext {
                url: feed_link.clone(),
                node_type: NodeType::Feed,
                link_type,
            };
            requests.push(DiscoveryRequest::child(url, NodeType::Website, ctx.depth() + 1, source));
        }
    }

    let mut posts = Vec::new();
    if ctx.depth() <= ctx.post_collection_depth {
        let feed_language = feed.language.clone();
        let mut extracted: Vec<(Post, usize)> = parsed
            .entries
            .into_iter()
            .filter_map(|e| extract_entry(ctx, &e, &feed.id, &feed_link, feed_language.as_deref()))
            .collect();

        extracted.sort_by(|a, b| b.0.date.cmp(&a.0.date));
        extracted.truncate(ctx.max_posts_per_feed);

        if !extracted.is_empty() {
            feed.post_count = extracted.len() as u64;
            let total_len: usize = extracted.iter().map(|(_, len)| len).sum();
            feed.avg_post_length = (total_len / extracted.len()) as u64;
            let newest = &extracted.first().unwrap().0.date;
            let oldest = &extracted.last().unwrap().0.date;
            let days = dates::days_between(newest, oldest);
            feed.avg_posts_per_day = if extracted.len() < 2 || days <= 0.0 {
                0.0
            } else {
                extracted.len() as f64 / days
            };
        }

        posts = extracted.into_iter().map(|(p, _)| p).collect();
    }

    let mut output = HandlerOutput::with_requests(requests);
    output.feed = Some(feed);
    output.posts = posts;
    output
}

/// Best-effort recommendation URL off a feed's website link, tried when no
/// explicit blogroll was found in the feed itself: the conventional
/// `blogroll.opml` path at that site's root.
fn build_recommendation_url(website_link: &str) -> Option<url::Url> {
    let base = match url::Url::parse(website_link) {
        Ok(u) => u,
        Err(e) => {
            warn!(link = website_link, error = %e, "failed to parse website link for recommendation derivation");
            return None;
        }
    };
    match base.join("/blogroll.opml") {
        Ok(u) => Some(u),
        Err(e) => {
            warn!(link = website_link, error = %e, "failed to derive recommendation url");
            None
        }
    }
}

fn primary_website_link(links: &[RawLink], is_atom: bool) -> Option<String> {
    if is_atom {
        links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate") && l.media_type.as_deref().map(|m| m.contains("html")).unwrap_or(true))
            .or_else(|| links.iter().find(|l| l.rel.as_deref() == Some("alternate")))
            .map(|l| l.href.clone())
    } else {
        links.iter().find(|l| l.rel.as_deref() != Some("next")).map(|l| l.href.clone())
    }
}

fn extract_entry(
    ctx: &DispatchContext,
    entry: &Entry,
    feed_id: &str,
    feed_link: &str,
    feed_language: Option<&str>,
) -> Option<(Post, usize)> {
    let title = process_title(&entry.title.clone().map(|t| t.content).unwrap_or_default());
    if title.is_empty() {
        return None;
    }

    let raw_description = entry.summary.clone().map(|s| s.content).unwrap_or_default();
    let raw_content = entry.content.clone().and_then(|c| c.body).unwrap_or_default();
    let content_len = feedmesh_parser::to_plain_text(&raw_content).len();
    let description = process_description(&raw_description);
    let content = process_content(&raw_content);

    if ctx.filter.has_block_words(&title) || ctx.filter.has_block_words(&description) || ctx.filter.has_block_words(&content) {
        return None;
    }

    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())?;

    if link.starts_with('/') || !(link.starts_with("http://") || link.starts_with("https://")) {
        return None;
    }

    let id = if entry.id.is_empty() { link.clone() } else { entry.id.clone() };
    let post_id = ids::post_id(&id, feed_link);

    if ctx.filter.is_blocked_post(&link, &title, &post_id) || ctx.filter.is_blocked_domain(&link) {
        return None;
    }

    let date = entry
        .updated
        .or(entry.published)
        .map(|d| dates::format_utc(d))
        .unwrap_or_else(|| dates::SENTINEL.to_string());

    if !dates::is_within_age_limit(&date, ctx.post_age_limit_days) {
        return None;
    }

    let categories = normalize_categories(entry.categories.iter().map(|c| c.term.clone()).collect());
    let language = resolve_language(None, None, feed_language);

    let post = Post {
        id: post_id,
        feed_id: feed_id.to_string(),
        feed_link: feed_link.to_string(),
        title,
        description,
        content,
        date,
        language,
        categories,
        link,
    };
    Some((post, content_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedmesh_core::filter::FilterPolicy;
    use feedmesh_core::{DiscoveryRequest, NodeType};

    fn ctx<'a>(req: &'a DiscoveryRequest, filter: &'a FilterPolicy) -> DispatchContext<'a> {
        DispatchContext {
            request: req,
            filter,
            post_collection_depth: 2,
            max_posts_per_feed: 100,
            post_age_limit_days: 36500,
        }
    }

    const ATOM_TWO_ENTRIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom Feed</title>
  <subtitle>desc</subtitle>
  <link href="https://example.com" rel="alternate" type="text/html"/>
  <updated>2024-01-02T00:00:00Z</updated>
  <entry>
    <title>spam in this title</title>
    <link href="https://example.com/1"/>
    <id>entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>one</summary>
  </entry>
  <entry>
    <title>Second Entry</title>
    <link href="https://example.com/2"/>
    <id>entry-2</id>
    <updated>2024-01-02T00:00:00Z</updated>
    <summary>two</summary>
  </entry>
</feed>"#;

    #[test]
    fn atom_feed_with_block_word_entry_keeps_feed_drops_that_post() {
        let filter = FilterPolicy::new(vec!["spam".into()], vec![], vec![]);
        let req = DiscoveryRequest::seed(url::Url::parse("https://example.com/feed.atom").unwrap());
        let out = handle(&ctx(&req, &filter), ATOM_TWO_ENTRIES.as_bytes());
        assert!(out.feed.is_some());
        assert_eq!(out.posts.len(), 1);
        assert_eq!(out.posts[0].title, "Second Entry");
        assert!(out.requests.iter().any(|r| r.dest_type == NodeType::Website));
    }

    const RSS_WITH_BLOGROLL: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:source="http://source.example/ns">
<channel>
  <title>Example RSS</title>
  <description>desc</description>
  <link>https://example.com</link>
  <source:blogroll>https://b.example/opml</source:blogroll>
  <item>
    <title>Item One</title>
    <link>https://example.com/item1</link>
    <guid>guid-1</guid>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    <description>body</description>
  </item>
</channel>
</rss>"#;

    #[test]
    fn rss_blogroll_element_becomes_discovery_request() {
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(url::Url::parse("https://example.com/feed.xml").unwrap());
        let out = handle(&ctx(&req, &filter), RSS_WITH_BLOGROLL.as_bytes());
        assert!(out.requests.iter().any(|r| r.dest_type == NodeType::Blogroll
            && r.dest_url.as_str() == "https://b.example/opml"));
    }

    #[test]
    fn relative_entry_link_is_rejected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>F</title>
  <entry>
    <title>E</title>
    <link href="/relative/path"/>
    <id>e1</id>
  </entry>
</feed>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(url::Url::parse("https://example.com/feed.atom").unwrap());
        let out = handle(&ctx(&req, &filter), xml.as_bytes());
        assert!(out.posts.is_empty());
    }

    #[test]
    fn same_guid_across_two_feeds_yields_distinct_post_ids() {
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req_a = DiscoveryRequest::seed(url::Url::parse("https://a.example/feed.xml").unwrap());
        let req_b = DiscoveryRequest::seed(url::Url::parse("https://b.example/feed.xml").unwrap());
        let out_a = handle(&ctx(&req_a, &filter), RSS_WITH_BLOGROLL.as_bytes());
        let out_b = handle(&ctx(&req_b, &filter), RSS_WITH_BLOGROLL.as_bytes());
        assert_ne!(out_a.posts[0].id, out_b.posts[0].id);
    }

    #[test]
    fn feed_with_no_explicit_blogroll_gets_a_derived_recommendation_request() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example RSS</title>
  <description>desc</description>
  <link>https://example.com</link>
  <item>
    <title>Item One</title>
    <link>https://example.com/item1</link>
    <guid>guid-1</guid>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    <description>body</description>
  </item>
</channel></rss>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(url::Url::parse("https://example.com/feed.xml").unwrap());
        let out = handle(&ctx(&req, &filter), xml.as_bytes());
        assert!(out.requests.iter().any(|r| {
            r.dest_type == NodeType::Blogroll && r.dest_url.as_str() == "https://example.com/blogroll.opml"
        }));
    }

    #[test]
    fn explicit_blogroll_suppresses_the_derived_recommendation() {
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(url::Url::parse("https://example.com/feed.xml").unwrap());
        let out = handle(&ctx(&req, &filter), RSS_WITH_BLOGROLL.as_bytes());
        let blogroll_requests: Vec<_> = out.requests.iter().filter(|r| r.dest_type == NodeType::Blogroll).collect();
        assert_eq!(blogroll_requests.len(), 1);
        assert_eq!(blogroll_requests[0].dest_url.as_str(), "https://b.example/opml");
    }

    #[test]
    fn depth_beyond_post_collection_cap_skips_posts_but_keeps_feed() {
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let url = url::Url::parse("https://example.com/feed.xml").unwrap();
        let req = DiscoveryRequest::child(
            url,
            NodeType::Feed,
            3,
            feedmesh_core::SourceContext {
                url: "https://x".into(),
                node_type: NodeType::Website,
                link_type: LinkType::RelAlternate,
            },
        );
        let out = handle(&ctx(&req, &filter), RSS_WITH_BLOGROLL.as_bytes());
        assert!(out.feed.is_some());
        assert!(out.posts.is_empty());
    }
}
