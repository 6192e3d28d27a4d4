//! One worker loop: dequeue, robots check, fetch, dispatch, enqueue
//! children, forward extracted Feed/Post records downstream. N of these
//! run concurrently against one shared `Frontier`.

use std::sync::Arc;

use feedmesh_core::filter::FilterPolicy;
use feedmesh_core::{CrawlError, Feed, Post};
use feedmesh_discovery::{dispatch, DispatchContext};
use feedmesh_frontier::Frontier;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::fetch::Fetcher;
use crate::robots::RobotsCache;

const NO_INDEX_STATUSES: [u16; 6] = [401, 403, 404, 405, 407, 410];

/// A Feed and/or its Posts produced from one successfully dispatched
/// response, handed to the persister.
#[derive(Debug)]
pub struct ExtractedContent {
    pub feed: Option<Feed>,
    pub posts: Vec<Post>,
}

pub struct WorkerConfig {
    pub filter: FilterPolicy,
    pub post_collection_depth: u32,
    pub max_posts_per_feed: usize,
    pub post_age_limit_days: i64,
}

pub async fn run(
    worker_id: usize,
    frontier: Arc<Frontier>,
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsCache>,
    config: Arc<WorkerConfig>,
    output: mpsc::Sender<ExtractedContent>,
) {
    debug!(worker_id, "worker started");
    while let Some(request) = frontier.next().await {
        let url = request.dest_url.clone();

        if !robots.is_allowed(&url).await {
            debug!(worker_id, %url, "robots.txt disallows this url");
            frontier.job_done();
            continue;
        }

        let response = match fetcher.fetch(&url).await {
            Ok(r) => r,
            Err(CrawlError::Timeout(ms)) => {
                warn!(worker_id, %url, timeout_ms = ms, "request timed out");
                frontier.job_done();
                continue;
            }
            Err(e) => {
                warn!(worker_id, %url, error = %e, "transport error");
                frontier.job_done();
                continue;
            }
        };

        if NO_INDEX_STATUSES.contains(&response.status) {
            frontier.graph.mark_no_index(url.as_str());
            debug!(worker_id, %url, status = response.status, "status added url to no-index set");
            frontier.job_done();
            continue;
        }
        if response.status != 200 {
            debug!(worker_id, %url, status = response.status, "non-200 response dropped");
            frontier.job_done();
            continue;
        }

        let no_archive = response
            .header("x-robots-tag")
            .map(|v| v.to_ascii_lowercase().split(',').any(|t| t.trim() == "noarchive"))
            .unwrap_or(false);

        let ctx = DispatchContext {
            request: &request,
            filter: &config.filter,
            post_collection_depth: config.post_collection_depth,
            max_posts_per_feed: config.max_posts_per_feed,
            post_age_limit_days: config.post_age_limit_days,
        };
        let mut handler_output = dispatch(&ctx, &response);

        if handler_output.mark_no_index {
            frontier.graph.mark_no_index(url.as_str());
        }
        if no_archive {
            if let Some(feed) = handler_output.feed.as_mut() {
                feed.is_no_archive = true;
            }
        }

        for child in handler_output.requests.drain(..) {
            frontier.push(child).await;
        }

        if handler_output.feed.is_some() || !handler_output.posts.is_empty() {
            let content = ExtractedContent {
                feed: handler_output.feed,
                posts: handler_output.posts,
            };
            if output.send(content).await.is_err() {
                error!(worker_id, "persister channel closed while a worker still had output");
            }
        }

        frontier.job_done();
    }
    debug!(worker_id, "worker exiting: frontier channel closed");
}
