pub mod fetch;
pub mod response_cache;
pub mod robots;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use feedmesh_core::ParsedConfig;
use feedmesh_frontier::Frontier;
use tokio::sync::mpsc;
use tracing::info;

pub use fetch::Fetcher;
pub use robots::RobotsCache;
pub use worker::{ExtractedContent, WorkerConfig};

/// Spawn `crawl_threads` workers against `frontier`, run them to completion
/// (queue drained, every worker idle), then return. Extracted Feed/Post
/// content streams out through `output` as it's produced; the caller
/// consumes it concurrently and drops the receiver once this returns.
pub async fn run_to_completion(
    frontier: Arc<Frontier>,
    config: &ParsedConfig,
    filter: feedmesh_core::filter::FilterPolicy,
    output: mpsc::Sender<ExtractedContent>,
) -> Result<(), feedmesh_core::CrawlError> {
    let fetcher = Arc::new(Fetcher::new(config)?);
    let robots_client = reqwest::Client::builder()
        .user_agent(fetch::USER_AGENT)
        .build()
        .map_err(|e| feedmesh_core::CrawlError::Config(e.to_string()))?;
    let robots = Arc::new(RobotsCache::new(robots_client));
    let worker_config = Arc::new(WorkerConfig {
        filter,
        post_collection_depth: config.post_collection_depth,
        max_posts_per_feed: config.max_posts_per_feed,
        post_age_limit_days: config.post_age_limit_days,
    });

    info!(workers = config.crawl_threads, "spawning crawl workers");
    let mut handles = Vec::with_capacity(config.crawl_threads);
    for worker_id in 0..config.crawl_threads {
        let frontier = Arc::clone(&frontier);
        let fetcher = Arc::clone(&fetcher);
        let robots = Arc::clone(&robots);
        let worker_config = Arc::clone(&worker_config);
        let output = output.clone();
        handles.push(tokio::spawn(async move {
            worker::run(worker_id, frontier, fetcher, robots, worker_config, output).await;
        }));
    }
    drop(output);

    // Workers block on `Frontier::next()` indefinitely; nothing closes the
    // queue on its own. This supervisor watches for the queue staying
    // drained across two consecutive polls and then closes it, which
    // unblocks every worker's `next()` with `None` so the handles below
    // join instead of hanging forever.
    let supervisor = {
        let frontier = Arc::clone(&frontier);
        tokio::spawn(async move {
            wait_until_drained(&frontier, Duration::from_millis(200)).await;
            frontier.shutdown().await;
        })
    };

    for handle in handles {
        let _ = handle.await;
    }
    let _ = supervisor.await;

    info!("crawl complete, queue drained and all workers idle");
    Ok(())
}

/// Poll `frontier.is_drained()` until the queue has been empty and every
/// worker idle for one consecutive check. Used by callers that want to
/// observe completion without owning the worker handles directly (e.g. a
/// supervisor task running alongside `run_to_completion`).
pub async fn wait_until_drained(frontier: &Frontier, poll_interval: Duration) {
    loop {
        if frontier.is_drained() {
            tokio::time::sleep(poll_interval).await;
            if frontier.is_drained() {
                return;
            }
            continue;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
