use feedmesh_core::filter::FilterPolicy;
use feedmesh_core::DiscoveryRequest;

/// Everything a content handler needs besides the fetched bytes: the
/// request that produced this fetch, the filter policy, and the handful of
/// config knobs that affect extraction (not admission, which the frontier
/// already applies to every request a handler emits).
pub struct DispatchContext<'a> {
    pub request: &'a DiscoveryRequest,
    pub filter: &'a FilterPolicy,
    pub post_collection_depth: u32,
    pub max_posts_per_feed: usize,
    pub post_age_limit_days: i64,
}

impl<'a> DispatchContext<'a> {
    pub fn depth(&self) -> u32 {
        self.request.depth
    }

    pub fn source_url(&self) -> String {
        self.request.dest_url.to_string()
    }
}

/// What a handler produced from one fetched response.
#[derive(Debug, Default)]
pub struct HandlerOutput {
    pub feed: Option<feedmesh_core::Feed>,
    pub posts: Vec<feedmesh_core::Post>,
    pub requests: Vec<DiscoveryRequest>,
    /// Set when the content itself (HTML meta-robots) asked not to be indexed.
    pub mark_no_index: bool,
}

impl HandlerOutput {
    pub fn with_requests(requests: Vec<DiscoveryRequest>) -> Self {
        Self {
            requests,
            ..Default::default()
        }
    }
}
