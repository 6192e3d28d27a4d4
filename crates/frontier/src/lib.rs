pub mod admission;
pub mod link_graph;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use feedmesh_core::ids::link_id;
use feedmesh_core::{DiscoveryRequest, Link};
use growable_bloom_filter::GrowableBloom;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

pub use admission::{AdmissionFilter, DropReason};
pub use link_graph::LinkGraph;

/// Outcome of pushing a discovery request through the frontier.
#[derive(Debug, Default)]
pub struct PushOutcome {
    /// Set whenever the request was admitted, regardless of whether it was
    /// actually enqueued — the recommendation fact is recorded either way.
    pub link: Option<Link>,
    pub enqueued: bool,
}

/// The bounded work queue plus URL+depth dedup and the shared Link Graph
/// Store. A single frontier instance is shared by every worker.
pub struct Frontier {
    tx: mpsc::Sender<DiscoveryRequest>,
    rx: Arc<AsyncMutex<mpsc::Receiver<DiscoveryRequest>>>,
    seen: AsyncMutex<GrowableBloom>,
    pub graph: LinkGraph,
    admission: AdmissionFilter,
    discover_depth: u32,
    /// Jobs currently queued or being processed by a worker. The crawl is
    /// done when this reaches zero.
    pending: AtomicI64,
}

const QUEUE_CAPACITY: usize = 10_000;

impl Frontier {
    pub fn new(admission: AdmissionFilter, discover_depth: u32, bloom_size: usize, bloom_fp_rate: f64) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        Self {
            tx,
            rx: Arc::new(AsyncMutex::new(rx)),
            seen: AsyncMutex::new(GrowableBloom::new(bloom_fp_rate, bloom_size.max(1))),
            graph: LinkGraph::new(),
            admission,
            discover_depth,
            pending: AtomicI64::new(0),
        }
    }

    fn dedup_key(url: &url::Url, depth: u32) -> String {
        format!("{depth}:{}", url.as_str().to_lowercase())
    }

    /// Push a discovery request. Always evaluates admission (which may
    /// produce a Link even if the request is never fetched); only enqueues
    /// a fetch job when depth is within the discover cap and the URL+depth
    /// pair hasn't been seen before. Blocks (providing backpressure) when
    /// the queue is full.
    pub async fn push(&self, req: DiscoveryRequest) -> PushOutcome {
        let normalized = match self.admission.admit(&req.dest_url) {
            Ok(url) => url,
            Err(reason) => {
                debug!(url = %req.dest_url, ?reason, "request not admitted");
                return PushOutcome::default();
            }
        };

        let link = req.source.as_ref().map(|source| Link {
            id: link_id(&source.url, normalized.as_str()),
            source_type: source.node_type,
            source_url: source.url.clone(),
            dest_type: req.dest_type,
            dest_url: normalized.to_string(),
            link_type: source.link_type,
        });
        if let Some(link) = &link {
            self.graph.record(link.clone());
        }

        if req.depth > self.discover_depth {
            debug!(url = %normalized, depth = req.depth, "beyond discover_depth, not fetched");
            return PushOutcome { link, enqueued: false };
        }

        let key = Self::dedup_key(&normalized, req.depth);
        {
            let mut seen = self.seen.lock().await;
            if seen.contains(&key) {
                return PushOutcome { link, enqueued: false };
            }
            seen.insert(&key);
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        let mut job = req;
        job.dest_url = normalized;
        if self.tx.send(job).await.is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return PushOutcome { link, enqueued: false };
        }
        PushOutcome { link, enqueued: true }
    }

    /// Seed URLs bypass admission's source-link requirement (there is no
    /// recommender) and the dedup bloom, mirroring how seed directories are
    /// re-crawled every run.
    pub async fn push_seed(&self, url: url::Url) -> bool {
        let normalized = match self.admission.admit(&url) {
            Ok(u) => u,
            Err(_) => return false,
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        let key = Self::dedup_key(&normalized, 0);
        self.seen.lock().await.insert(&key);
        if self
            .tx
            .send(DiscoveryRequest::seed(normalized))
            .await
            .is_err()
        {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Workers call this in a loop to pull the next job. Returns `None`
    /// only if every sender (every worker) has been dropped.
    pub async fn next(&self) -> Option<DiscoveryRequest> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Call once a worker has fully finished processing a job (including
    /// enqueuing any children it discovered).
    pub fn job_done(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn pending_count(&self) -> i64 {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_drained(&self) -> bool {
        self.pending_count() <= 0
    }

    /// Close the work queue, unblocking every worker parked in `next()`
    /// with `None`. Call once, after `is_drained()` has held steady, from a
    /// single supervisor task -- not from a worker itself.
    pub async fn shutdown(&self) {
        self.rx.lock().await.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedmesh_core::filter::FilterPolicy;
    use url::Url;

    fn frontier() -> Frontier {
        let admission = AdmissionFilter::new(FilterPolicy::default(), vec![]);
        Frontier::new(admission, 4, 1000, 0.01)
    }

    #[tokio::test]
    async fn shutdown_unblocks_pending_next_calls_with_none() {
        let f = Arc::new(frontier());
        let waiter = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.next().await })
        };
        tokio::task::yield_now().await;
        f.shutdown().await;
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seed_push_is_always_enqueued() {
        let f = frontier();
        assert!(f.push_seed(Url::parse("https://example.com/").unwrap()).await);
        assert_eq!(f.pending_count(), 1);
        let job = f.next().await.unwrap();
        assert_eq!(job.dest_url.as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn depth_beyond_discover_cap_is_not_enqueued() {
        let f = frontier();
        let req = DiscoveryRequest {
            dest_url: Url::parse("https://example.com/deep").unwrap(),
            dest_type: feedmesh_core::NodeType::Feed,
            depth: 5,
            source: Some(feedmesh_core::SourceContext {
                url: "https://example.com/".to_string(),
                node_type: feedmesh_core::NodeType::Website,
                link_type: feedmesh_core::LinkType::RelAlternate,
            }),
        };
        let outcome = f.push(req).await;
        assert!(outcome.link.is_some());
        assert!(!outcome.enqueued);
    }

    #[tokio::test]
    async fn duplicate_url_depth_is_deduped() {
        let f = frontier();
        let make_req = || DiscoveryRequest {
            dest_url: Url::parse("https://example.com/feed.xml").unwrap(),
            dest_type: feedmesh_core::NodeType::Feed,
            depth: 1,
            source: Some(feedmesh_core::SourceContext {
                url: "https://example.com/".to_string(),
                node_type: feedmesh_core::NodeType::Website,
                link_type: feedmesh_core::LinkType::RelAlternate,
            }),
        };
        assert!(f.push(make_req()).await.enqueued);
        assert!(!f.push(make_req()).await.enqueued);
    }

    #[tokio::test]
    async fn blocked_domain_produces_no_link() {
        let admission = AdmissionFilter::new(
            FilterPolicy::new(vec![], vec!["bad.example".to_string()], vec![]),
            vec![],
        );
        let f = Frontier::new(admission, 4, 1000, 0.01);
        let req = DiscoveryRequest {
            dest_url: Url::parse("https://bad.example/feed.xml").unwrap(),
            dest_type: feedmesh_core::NodeType::Feed,
            depth: 1,
            source: Some(feedmesh_core::SourceContext {
                url: "https://example.com/".to_string(),
                node_type: feedmesh_core::NodeType::Website,
                link_type: feedmesh_core::LinkType::RelAlternate,
            }),
        };
        let outcome = f.push(req).await;
        assert!(outcome.link.is_none());
        assert!(!outcome.enqueued);
    }
}
