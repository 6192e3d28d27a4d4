//! OPML blogroll handler. An OPML document is a tree of `<outline>`
//! elements; any outline carrying `xmlUrl` names a feed, any outline
//! carrying `htmlUrl` names a website, and both are recorded as recommended
//! by this document regardless of nesting depth in the outline tree.

use feedmesh_core::{DiscoveryRequest, LinkType, NodeType, SourceContext};
use opml::{Outline, OPML};
use tracing::{debug, warn};
use url::Url;

use crate::context::{DispatchContext, HandlerOutput};

pub fn handle(ctx: &DispatchContext, body: &[u8]) -> HandlerOutput {
    let text = match std::str::from_utf8(body) {
        Ok(t) => t,
        Err(_) => {
            warn!(url = %ctx.source_url(), "opml body is not valid utf-8");
            return HandlerOutput::default();
        }
    };

    let doc = match OPML::from_str(text) {
        Ok(d) => d,
        Err(e) => {
            warn!(url = %ctx.source_url(), error = %e, "failed to parse opml");
            return HandlerOutput::default();
        }
    };

    let base = ctx.request.dest_url.clone();
    let source = SourceContext {
        url: ctx.source_url(),
        node_type: NodeType::Blogroll,
        link_type: LinkType::FromOpml,
    };

    let mut requests = Vec::new();
    collect(&doc.body.outlines, &base, &source, ctx.depth() + 1, &mut requests);
    HandlerOutput::with_requests(requests)
}

fn collect(outlines: &[Outline], base: &Url, source: &SourceContext, depth: u32, out: &mut Vec<DiscoveryRequest>) {
    for outline in outlines {
        if outline.r#type.as_deref() == Some("include") {
            debug!(text = %outline.text, "skipping opml include outline");
        } else {
            if let Some(xml_url) = outline.xml_url.as_deref().filter(|s| !s.is_empty()) {
                if let Ok(resolved) = base.join(xml_url) {
                    out.push(DiscoveryRequest::child(resolved, NodeType::Feed, depth, source.clone()));
                }
            }
            if let Some(html_url) = outline.html_url.as_deref().filter(|s| !s.is_empty()) {
                if let Ok(resolved) = base.join(html_url) {
                    out.push(DiscoveryRequest::child(resolved, NodeType::Website, depth, source.clone()));
                }
            }
        }
        if !outline.outlines.is_empty() {
            collect(&outline.outlines, base, source, depth, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedmesh_core::filter::FilterPolicy;

    fn ctx(req: &DiscoveryRequest, filter: &FilterPolicy) -> DispatchContext<'_> {
        DispatchContext {
            request: req,
            filter,
            post_collection_depth: 2,
            max_posts_per_feed: 100,
            post_age_limit_days: 36500,
        }
    }

    #[test]
    fn flat_opml_emits_feed_and_website_requests() {
        let xml = r#"<?xml version="1.0"?>
<opml version="2.0"><head><title>x</title></head>
<body>
  <outline text="Example" type="rss" xmlUrl="https://example.com/feed.xml" htmlUrl="https://example.com"/>
</body></opml>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(Url::parse("https://example.com/blogroll.opml").unwrap());
        let out = handle(&ctx(&req, &filter), xml.as_bytes());
        assert_eq!(out.requests.len(), 2);
        assert!(out.requests.iter().any(|r| r.dest_type == NodeType::Feed));
        assert!(out.requests.iter().any(|r| r.dest_type == NodeType::Website));
    }

    #[test]
    fn nested_outlines_are_walked_recursively() {
        let xml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
  <outline text="Tech">
    <outline text="Inner" type="rss" xmlUrl="https://example.com/inner.xml"/>
  </outline>
</body></opml>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(Url::parse("https://example.com/blogroll.opml").unwrap());
        let out = handle(&ctx(&req, &filter), xml.as_bytes());
        assert_eq!(out.requests.len(), 1);
        assert_eq!(out.requests[0].dest_url.as_str(), "https://example.com/inner.xml");
    }

    #[test]
    fn include_outlines_are_skipped() {
        let xml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
  <outline type="include" url="https://example.com/other.opml"/>
</body></opml>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(Url::parse("https://example.com/blogroll.opml").unwrap());
        let out = handle(&ctx(&req, &filter), xml.as_bytes());
        assert!(out.requests.is_empty());
    }

    #[test]
    fn relative_urls_resolve_against_document_url() {
        let xml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
  <outline text="Rel" type="rss" xmlUrl="/feed.xml"/>
</body></opml>"#;
        let filter = FilterPolicy::new(vec![], vec![], vec![]);
        let req = DiscoveryRequest::seed(Url::parse("https://example.com/sub/blogroll.opml").unwrap());
        let out = handle(&ctx(&req, &filter), xml.as_bytes());
        assert_eq!(out.requests[0].dest_url.as_str(), "https://example.com/feed.xml");
    }
}
