//! URL normalization and admission: every outbound fetch candidate passes
//! through here before it can become a Link record or a queued request.

use std::collections::HashSet;

use feedmesh_core::filter::FilterPolicy;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    InvalidScheme,
    BlockedDomain,
}

/// Reject `mailto:` and any scheme other than http/https. Upgrade http to
/// https unless the host is in `http_only_hosts`. Empty path becomes `/`.
/// Lowercase host, strip default port, strip fragment.
pub fn normalize_url(url: &Url, http_only_hosts: &HashSet<String>) -> Option<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let host = normalized.host_str()?.to_lowercase();
    if normalized.scheme() == "http" && !http_only_hosts.contains(&host) {
        normalized.set_scheme("https").ok()?;
    }

    if normalized.path().is_empty() {
        normalized.set_path("/");
    }

    // strip default port for the (possibly-upgraded) scheme
    if let Some(port) = normalized.port() {
        let default = match normalized.scheme() {
            "http" => 80,
            "https" => 443,
            _ => 0,
        };
        if port == default {
            let _ = normalized.set_port(None);
        }
    }

    Some(normalized)
}

pub struct AdmissionFilter {
    pub filter: FilterPolicy,
    pub http_only_hosts: HashSet<String>,
}

impl AdmissionFilter {
    pub fn new(filter: FilterPolicy, http_only_hosts: Vec<String>) -> Self {
        Self {
            filter,
            http_only_hosts: http_only_hosts.into_iter().collect(),
        }
    }

    /// Normalize and run the block-domain check. Returns the normalized URL
    /// on success, or the reason it was dropped.
    pub fn admit(&self, url: &Url) -> Result<Url, DropReason> {
        let normalized = normalize_url(url, &self.http_only_hosts).ok_or(DropReason::InvalidScheme)?;
        if self.filter.is_blocked_domain(normalized.as_str()) {
            debug!(url = %normalized, "dropped: blocked domain");
            return Err(DropReason::BlockedDomain);
        }
        Ok(normalized)
    }
}
