//! HTTP transport. One `reqwest::Client` shared by every worker, configured
//! once from `ParsedConfig`'s timeout/proxy knobs. `reqwest` doesn't expose
//! dial and TLS-handshake timing as separate dials, so both collapse onto
//! `connect_timeout`; the header and total timeouts are distinguished by
//! wrapping `send()` (headers arrive there) and `bytes()` (body) in
//! independent `tokio::time::timeout` calls.

use std::collections::HashMap;
use std::time::Duration;

use feedmesh_core::{CrawlError, FetchResponse};
use reqwest::Client;
use url::Url;

use crate::response_cache::ResponseCache;

pub const USER_AGENT: &str = "Feed2Pages/0.1";
pub const REFERER: &str = "https://alexsci.com/rss-blogroll-network/";

pub struct Fetcher {
    client: Client,
    header_timeout: Option<Duration>,
    total_timeout: Option<Duration>,
    cache: ResponseCache,
}

impl Fetcher {
    pub fn new(cfg: &feedmesh_core::ParsedConfig) -> Result<Self, CrawlError> {
        let mut builder = Client::builder().user_agent(USER_AGENT).redirect(reqwest::redirect::Policy::limited(5));

        let connect_ms = cfg.http_dial_timeout_ms.or(cfg.http_tls_timeout_ms);
        if let Some(ms) = connect_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(proxy_url) = &cfg.http_proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| CrawlError::Config(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| CrawlError::Config(e.to_string()))?;
        Ok(Self {
            client,
            header_timeout: cfg.http_response_header_timeout_ms.map(Duration::from_millis),
            total_timeout: cfg.request_timeout_ms.map(Duration::from_millis),
            cache: ResponseCache::new(cfg.response_cache_dir.clone()),
        })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlError> {
        if let Some(cached) = self.cache.get(url) {
            return Ok(cached);
        }

        let request = self.client.get(url.clone()).header("Referer", REFERER).build().map_err(|e| CrawlError::Network(e.to_string()))?;

        let send = self.client.execute(request);
        let response = match self.header_timeout {
            Some(d) => tokio::time::timeout(d, send)
                .await
                .map_err(|_| CrawlError::Timeout(d.as_millis() as u64))?
                .map_err(|e| CrawlError::Network(e.to_string()))?,
            None => send.await.map_err(|e| CrawlError::Network(e.to_string()))?,
        };

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body_future = response.bytes();
        let body = match self.total_timeout {
            Some(d) => tokio::time::timeout(d, body_future)
                .await
                .map_err(|_| CrawlError::Timeout(d.as_millis() as u64))?
                .map_err(|e| CrawlError::Network(e.to_string()))?,
            None => body_future.await.map_err(|e| CrawlError::Network(e.to_string()))?,
        };

        let response = FetchResponse {
            url: url.clone(),
            status,
            headers,
            body: body.to_vec(),
        };
        self.cache.put(&response);
        Ok(response)
    }
}
