//! HTML fallback handler. Only runs for `Website`/`Seed` targets (a bare
//! page can't itself be a feed, but its links and meta tags still drive
//! discovery). Extracts meta-robots directives and rel=blogroll/alternate/
//! canonical/me links.

use feedmesh_core::{DiscoveryRequest, LinkType, NodeType, SourceContext};
use scraper::{Html, Selector};
use tracing::debug;

use crate::context::{DispatchContext, HandlerOutput};

struct RobotsDirectives {
    no_index: bool,
    no_follow: bool,
}

fn meta_robots(doc: &Html) -> RobotsDirectives {
    let sel = Selector::parse("meta").unwrap();
    let mut generic: Option<String> = None;
    let mut override_content: Option<String> = None;

    for el in doc.select(&sel) {
        let Some(name) = el.value().attr("name") else { continue };
        let name = name.to_ascii_lowercase();
        let Some(content) = el.value().attr("content") else { continue };
        if name == "robots" {
            generic = Some(content.to_ascii_lowercase());
        } else if name == "feed2pages/0.1" {
            override_content = Some(content.to_ascii_lowercase());
        }
    }

    let content = override_content.or(generic).unwrap_or_default();
    let tokens: Vec<&str> = content.split(',').map(|t| t.trim()).collect();
    RobotsDirectives {
        no_index: tokens.iter().any(|t| *t == "noindex" || *t == "none"),
        no_follow: tokens.iter().any(|t| *t == "nofollow" || *t == "none"),
    }
}

pub fn handle(ctx: &DispatchContext, body: &[u8]) -> HandlerOutput {
    if !matches!(ctx.request.dest_type, NodeType::Website | NodeType::Seed) {
        return HandlerOutput::default();
    }

    let text = String::from_utf8_lossy(body);
    let doc = Html::parse_document(&text);
    let directives = meta_robots(&doc);

    let base = ctx.request.dest_url.clone();
    let mut requests = Vec::new();

    let link_sel = Selector::parse("link, a").unwrap();
    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else { continue };
        let Ok(dest) = base.join(href) else { continue };

        let rels: std::collections::HashSet<String> = el
            .value()
            .attr("rel")
            .unwrap_or("")
            .split_whitespace()
            .map(|r| r.to_ascii_lowercase())
            .collect();
        let media_type = el.value().attr("type").unwrap_or("").to_ascii_lowercase();

        let source_url = base.to_string();

        if rels.contains("me") && matches!(media_type.as_str(), "" | "text/html" | "application/xhtml+xml") {
            let source = SourceContext {
                url: source_url.clone(),
                node_type: NodeType::Website,
                link_type: LinkType::RelMe,
            };
            requests.push(DiscoveryRequest::child(dest.clone(), NodeType::Website, ctx.depth() + 1, source));
        }

        if directives.no_follow {
            continue;
        }

        if rels.contains("blogroll") && matches!(media_type.as_str(), "text/xml" | "application/xml") {
            let source = SourceContext {
                url: source_url.clone(),
                node_type: NodeType::Website,
                link_type: LinkType::RelBlogroll,
            };
            requests.push(DiscoveryRequest::child(dest.clone(), NodeType::Blogroll, ctx.depth() + 1, source));
        }

        if rels.contains("alternate") && matches!(media_type.as_str(), "application/atom+xml" | "application/rss+xml") {
            let source = SourceContext {
                url: source_url.clone(),
                node_type: NodeType::Website,
                link_type: LinkType::RelAlternate,
            };
            requests.push(DiscoveryRequest::child(dest.clone(), NodeType::Feed, ctx.depth() + 1, source));
        }

        if rels.contains("canonical") {
            let source = SourceContext {
                url: source_url,
                node_type: NodeType::Website,
                link_type: LinkType::RelCanonical,
            };
            requests.push(DiscoveryRequest::child(dest, NodeType::Canonical, ctx.depth() + 1, source));
        }
    }

    if directives.no_index {
        debug!(url = %base, "html meta-robots marks page no-index");
    }

    let mut output = HandlerOutput::with_requests(requests);
    output.mark_no_index = directives.no_index;
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedmesh_core::filter::FilterPolicy;
    use url::Url;

    fn ctx<'a>(req: &'a DiscoveryRequest, filter: &'a FilterPolicy) -> DispatchContext<'a> {
        DispatchContext {
            request: req,
            filter,
            post_collection_depth: 2,
            max_posts_per_feed: 100,
            post_age_limit_days: 36500,
        }
    }

    #[test]
    fn noindex_meta_marks_output_and_nofollow_suppresses_feed_discovery() {
        let html = r#"<html><head>
        <meta name="robots" content="noindex, nofollow">
        <link rel="alternate" type="application/rss+xml" href="/feed.xml">
        <a rel="me" href="https://elsewhere.example/me"></a>
        </head></html>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(Url::parse("https://example.com").unwrap());
        let out = handle(&ctx(&req, &filter), html.as_bytes());
        assert!(out.mark_no_index);
        assert!(out.requests.iter().all(|r| r.dest_type != NodeType::Feed));
        assert!(out.requests.iter().any(|r| {
            r.dest_type == NodeType::Website && r.source.as_ref().map(|s| s.link_type) == Some(LinkType::RelMe)
        }));
    }

    #[test]
    fn rel_blogroll_and_canonical_links_are_collected() {
        let html = r#"<html><head>
        <link rel="blogroll" type="text/xml" href="/blogroll.opml">
        <link rel="canonical" href="https://canonical.example/page">
        </head></html>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(Url::parse("https://example.com").unwrap());
        let out = handle(&ctx(&req, &filter), html.as_bytes());
        assert!(out.requests.iter().any(|r| r.dest_type == NodeType::Blogroll));
        assert!(out.requests.iter().any(|r| r.dest_type == NodeType::Canonical));
    }

    #[test]
    fn non_website_target_is_ignored() {
        let html = r#"<html><head><link rel="canonical" href="/x"></head></html>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let source = SourceContext {
            url: "https://x".into(),
            node_type: NodeType::Feed,
            link_type: LinkType::FromFeed,
        };
        let req = DiscoveryRequest::child(Url::parse("https://example.com/feed.xml").unwrap(), NodeType::Feed, 1, source);
        let out = handle(&ctx(&req, &filter), html.as_bytes());
        assert!(out.requests.is_empty());
    }
}
