use std::sync::Arc;

use anyhow::{Context, Result};
use feedmesh_core::{Config, DiscoveryRequest, NodeType, PrivateBlocks};
use feedmesh_discovery::jq_source;
use feedmesh_frontier::{AdmissionFilter, Frontier};
use feedmesh_scheduler::ExtractedContent;
use feedmesh_storage::{hugo::HugoContent, Storage};
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const CONFIG_PATH: &str = "feeds.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_str = std::fs::read_to_string(CONFIG_PATH)
        .with_context(|| format!("reading {CONFIG_PATH}"))?;
    let raw: Config = serde_yaml::from_str(&config_str).context("parsing feeds.yaml")?;
    let mut config = raw.parse();

    if let Some(private_path) = private_blocks_path(&config_str)? {
        let private_str = std::fs::read_to_string(&private_path)
            .with_context(|| format!("reading private_blocks_file {private_path}"))?;
        let private: PrivateBlocks = serde_yaml::from_str(&private_str).context("parsing private_blocks_file")?;
        config.merge_private_blocks(private);
    }

    let filter = config.filter_policy();
    let admission = AdmissionFilter::new(filter.clone(), config.http_only_hosts.clone());
    let frontier = Arc::new(Frontier::new(admission, config.discover_depth, config.bloom_filter_size, config.bloom_filter_fp_rate));

    for seed in &config.feed_urls {
        match Url::parse(seed) {
            Ok(url) => {
                frontier.push_seed(url).await;
            }
            Err(e) => warn!(seed, error = %e, "invalid seed URL, skipping"),
        }
    }

    seed_non_opml_blogrolls(&frontier, &config).await;

    let storage = if config.output_mode.iter().any(|m| m == "SQL") {
        let db = Storage::new("sqlite://feedmesh.db?mode=rwc").await?;
        db.run_migrations().await?;
        Some(Arc::new(db))
    } else {
        None
    };
    let hugo = if config.output_mode.iter().any(|m| m == "HugoContent") {
        let sink = HugoContent::new(
            &config.reading_folder_name,
            &config.following_folder_name,
            &config.discover_folder_name,
            &config.network_folder_name,
            config.remove_old_content,
        );
        sink.prepare()?;
        Some(Arc::new(sink))
    } else {
        None
    };

    let (tx, rx) = mpsc::channel::<ExtractedContent>(1024);
    let persister = tokio::spawn(run_persister(rx, storage.clone(), hugo.clone(), config.max_posts));

    feedmesh_scheduler::run_to_completion(Arc::clone(&frontier), &config, filter, tx).await?;

    match persister.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("persistence failure: {e}"),
        Err(e) => panic!("persister task panicked: {e}"),
    }

    let live_links = frontier.graph.drain_live();
    info!(count = live_links.len(), "persisting final link graph");
    for link in &live_links {
        if let Some(db) = &storage {
            if let Err(e) = db.store_link(link).await {
                panic!("persistence failure: {e}");
            }
        }
        if let Some(sink) = &hugo {
            if let Err(e) = sink.write_link(link) {
                panic!("persistence failure: {e}");
            }
        }
    }

    info!("crawl finished");
    Ok(())
}

fn private_blocks_path(config_str: &str) -> Result<Option<String>> {
    #[derive(serde::Deserialize)]
    struct Peek {
        private_blocks_file: Option<String>,
    }
    let peek: Peek = serde_yaml::from_str(config_str).context("parsing feeds.yaml")?;
    Ok(peek.private_blocks_file.filter(|p| !p.is_empty()))
}

async fn seed_non_opml_blogrolls(frontier: &Frontier, config: &feedmesh_core::ParsedConfig) {
    let client = reqwest::Client::new();
    for source in &config.non_opml_blogroll_urls {
        if source.handler != "jq" {
            warn!(url = %source.url, handler = %source.handler, "unsupported non_opml_blogroll_urls handler, skipping");
            continue;
        }
        let query = source
            .settings
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or(".");

        let body = match client.get(&source.url).send().await.and_then(|r| r.error_for_status()) {
            Ok(resp) => match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(url = %source.url, error = %e, "failed to read non_opml_blogroll_urls response");
                    continue;
                }
            },
            Err(e) => {
                warn!(url = %source.url, error = %e, "failed to fetch non_opml_blogroll_urls source");
                continue;
            }
        };
        let document: serde_json::Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(url = %source.url, error = %e, "non_opml_blogroll_urls source is not valid JSON");
                continue;
            }
        };
        let urls = match jq_source::run(&document, query) {
            Ok(urls) => urls,
            Err(e) => {
                warn!(url = %source.url, query, error = %e, "jq query failed");
                continue;
            }
        };
        for url in urls {
            match Url::parse(&url) {
                Ok(parsed) => {
                    frontier
                        .push(DiscoveryRequest {
                            dest_url: parsed,
                            dest_type: NodeType::Blogroll,
                            depth: 0,
                            source: None,
                        })
                        .await;
                }
                Err(e) => warn!(url, error = %e, "jq-derived URL is invalid, skipping"),
            }
        }
    }
}

async fn run_persister(
    mut rx: mpsc::Receiver<ExtractedContent>,
    storage: Option<Arc<Storage>>,
    hugo: Option<Arc<HugoContent>>,
    max_posts: usize,
) -> Result<()> {
    let mut posts_written = 0usize;
    while let Some(content) = rx.recv().await {
        if let Some(feed) = &content.feed {
            if let Some(db) = &storage {
                db.store_feed(feed).await?;
            }
            if let Some(sink) = &hugo {
                sink.write_feed(feed)?;
            }
        }
        for post in &content.posts {
            if posts_written >= max_posts {
                break;
            }
            if let Some(db) = &storage {
                db.store_post(post).await?;
            }
            if let Some(sink) = &hugo {
                sink.write_post(post)?;
            }
            posts_written += 1;
        }
    }
    info!(posts_written, "persister drained");
    Ok(())
}
