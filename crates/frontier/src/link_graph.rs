//! The in-memory Link Graph Store: every admitted edge is recorded here
//! immediately (deduplicated by composite key, later edges update the same
//! record), so that no-index pruning at shutdown can drop any edge whose
//! endpoint was flagged, for every persistence sink alike.

use dashmap::{DashMap, DashSet};
use feedmesh_core::Link;

#[derive(Default)]
pub struct LinkGraph {
    links: DashMap<String, Link>,
    /// URLs marked no-index during the crawl (HTTP 401/403/404/405/407/410,
    /// X-Robots-Tag: noindex, or HTML meta robots noindex).
    no_index: DashSet<String>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or update) an edge. Admitted requests always produce a Link
    /// record, even if the fetch of the destination later fails.
    pub fn record(&self, link: Link) {
        self.links.insert(link.composite_key(), link);
    }

    pub fn mark_no_index(&self, url: &str) {
        self.no_index.insert(url.to_string());
    }

    pub fn is_no_index(&self, url: &str) -> bool {
        self.no_index.contains(url)
    }

    pub fn no_index_len(&self) -> usize {
        self.no_index.len()
    }

    /// Drain every live edge (neither endpoint no-indexed), consuming the
    /// no-index set in the process. Intended to run exactly once at
    /// shutdown before handing the result to the persister.
    pub fn drain_live(&self) -> Vec<Link> {
        let live: Vec<Link> = self
            .links
            .iter()
            .filter(|entry| {
                let link = entry.value();
                !self.no_index.contains(&link.source_url) && !self.no_index.contains(&link.dest_url)
            })
            .map(|entry| entry.value().clone())
            .collect();
        self.links.clear();
        self.no_index.clear();
        live
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
