//! Content Dispatcher. Given a fetched response, sniffs the document's
//! root element and routes to the matching handler; the `X-Robots-Tag`
//! header is inspected before any parsing is attempted.

use feedmesh_core::FetchResponse;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::warn;

use crate::context::{DispatchContext, HandlerOutput};
use crate::{feed, html, opml};

fn sniff_root_tag(bytes: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().local_name().as_ref()).to_string());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn header_has_directive(response: &FetchResponse, directive: &str) -> bool {
    response
        .header("x-robots-tag")
        .map(|v| v.to_ascii_lowercase().split(',').any(|t| t.trim() == directive))
        .unwrap_or(false)
}

pub fn dispatch(ctx: &DispatchContext, response: &FetchResponse) -> HandlerOutput {
    if header_has_directive(response, "noindex") || header_has_directive(response, "none") {
        let mut out = HandlerOutput::default();
        out.mark_no_index = true;
        return out;
    }

    match sniff_root_tag(&response.body).as_deref() {
        Some("opml") => opml::handle(ctx, &response.body),
        Some("rss") | Some("RDF") => feed::handle(ctx, &response.body),
        Some("feed") => feed::handle(ctx, &response.body),
        _ => {
            if matches!(ctx.request.dest_type, feedmesh_core::NodeType::Website | feedmesh_core::NodeType::Seed) {
                html::handle(ctx, &response.body)
            } else {
                warn!(url = %ctx.source_url(), "response did not match any known content type");
                HandlerOutput::default()
            }
        }
    }
}
