//! A second, untyped pass over feed bytes for elements feed-rs doesn't
//! surface: channel/feed-level `blogroll` links and `itunes:category`
//! podcast tags. Both are scoped to the channel/feed level -- collection
//! stops at the first `item`/`entry` element, matching how a reader would
//! only expect these under the feed header, not repeated per post.

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::reader::Reader;

#[derive(Debug, Default)]
pub struct RawScanResult {
    pub blogrolls: Vec<String>,
    pub itunes_categories: Vec<String>,
}

fn local_name(name: QName) -> String {
    String::from_utf8_lossy(name.local_name().as_ref()).to_string()
}

/// Scan raw feed bytes for channel-level `blogroll` and `itunes:category`
/// elements, ignoring XML namespace prefixes (matched by local name only).
pub fn scan(bytes: &[u8]) -> RawScanResult {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut result = RawScanResult::default();
    let mut buf = Vec::new();
    let mut in_item = false;
    let mut in_blogroll = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_name(e.name());
                match name.as_str() {
                    "item" | "entry" => in_item = true,
                    "blogroll" if !in_item => {
                        in_blogroll = true;
                    }
                    "category" if !in_item => {
                        if e
                            .attributes()
                            .flatten()
                            .any(|a| local_name(a.key) == "text" || local_name(a.key) == "category")
                        {
                            if let Some(attr) = e.attributes().flatten().find(|a| {
                                let k = local_name(a.key);
                                k == "text" || k == "category"
                            }) {
                                if let Ok(v) = attr.unescape_value() {
                                    let v = v.to_string();
                                    if !v.is_empty() {
                                        result.itunes_categories.push(v);
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.name());
                if name == "category" && !in_item {
                    if let Some(attr) = e.attributes().flatten().find(|a| {
                        let k = local_name(a.key);
                        k == "text" || k == "category"
                    }) {
                        if let Ok(v) = attr.unescape_value() {
                            let v = v.to_string();
                            if !v.is_empty() {
                                result.itunes_categories.push(v);
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if in_blogroll && !in_item {
                    if let Ok(text) = t.unescape() {
                        let text = text.trim().to_string();
                        if !text.is_empty() {
                            result.blogrolls.push(text);
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.name());
                match name.as_str() {
                    "blogroll" => in_blogroll = false,
                    "item" | "entry" => {}
                    _ => {}
                }
            }
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    result.blogrolls.sort();
    result.blogrolls.dedup();
    result.itunes_categories.sort();
    result.itunes_categories.dedup();
    result
}
