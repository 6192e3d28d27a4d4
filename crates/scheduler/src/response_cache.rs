//! Optional on-disk response cache: one file per URL, keyed by a hash of
//! the normalized URL. Checked before every live fetch, populated after.
//! Not cross-run history in the sense the non-goals exclude -- this only
//! saves a second worker from re-fetching a URL two blogrolls both name
//! within the same run.

use std::collections::HashMap;
use std::path::PathBuf;

use feedmesh_core::ids::md5_hex;
use feedmesh_core::FetchResponse;
use tracing::debug;
use url::Url;

pub struct ResponseCache {
    dir: Option<PathBuf>,
}

impl ResponseCache {
    pub fn new(dir: Option<String>) -> Self {
        Self { dir: dir.map(PathBuf::from) }
    }

    fn path_for(&self, url: &Url) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(md5_hex(url.as_str())))
    }

    pub fn get(&self, url: &Url) -> Option<FetchResponse> {
        let path = self.path_for(url)?;
        let bytes = std::fs::read(&path).ok()?;
        match decode(&bytes) {
            Some((status, headers, body)) => Some(FetchResponse {
                url: url.clone(),
                status,
                headers,
                body,
            }),
            None => {
                debug!(path = %path.display(), "cached response file is malformed, ignoring");
                None
            }
        }
    }

    pub fn put(&self, response: &FetchResponse) {
        let Some(path) = self.path_for(&response.url) else { return };
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let encoded = encode(response);
        if let Err(e) = std::fs::write(&path, encoded) {
            debug!(path = %path.display(), error = %e, "failed to write response cache entry");
        }
    }
}

/// `<status>\n<header>\t<value>\n...\n\n<raw body bytes>`.
fn encode(response: &FetchResponse) -> Vec<u8> {
    let mut head = format!("{}\n", response.status);
    for (k, v) in &response.headers {
        head.push_str(k);
        head.push('\t');
        head.push_str(v);
        head.push('\n');
    }
    head.push('\n');
    let mut out = head.into_bytes();
    out.extend_from_slice(&response.body);
    out
}

fn decode(bytes: &[u8]) -> Option<(u16, HashMap<String, String>, Vec<u8>)> {
    let split_at = find_double_newline(bytes)?;
    let head = std::str::from_utf8(&bytes[..split_at]).ok()?;
    let body = bytes[split_at + 2..].to_vec();

    let mut lines = head.lines();
    let status: u16 = lines.next()?.parse().ok()?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once('\t') {
            headers.insert(k.to_string(), v.to_string());
        }
    }
    Some((status, headers, body))
}

fn find_double_newline(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(url: &str, status: u16, body: &[u8]) -> FetchResponse {
        let mut headers = HashMap::new();
        headers.insert("x-robots-tag".to_string(), "noarchive".to_string());
        FetchResponse {
            url: Url::parse(url).unwrap(),
            status,
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn miss_when_no_dir_configured() {
        let cache = ResponseCache::new(None);
        let url = Url::parse("https://example.com/feed.xml").unwrap();
        assert!(cache.get(&url).is_none());
    }

    #[test]
    fn round_trips_a_stored_response() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(Some(tmp.path().to_string_lossy().to_string()));
        let resp = response("https://example.com/feed.xml", 200, b"<rss></rss>");
        cache.put(&resp);

        let loaded = cache.get(&resp.url).expect("cache hit");
        assert_eq!(loaded.status, 200);
        assert_eq!(loaded.body, b"<rss></rss>");
        assert_eq!(loaded.headers.get("x-robots-tag").map(String::as_str), Some("noarchive"));
    }

    #[test]
    fn distinct_urls_hash_to_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(Some(tmp.path().to_string_lossy().to_string()));
        cache.put(&response("https://a.example/feed.xml", 200, b"a"));
        cache.put(&response("https://b.example/feed.xml", 200, b"b"));

        let a = cache.get(&Url::parse("https://a.example/feed.xml").unwrap()).unwrap();
        let b = cache.get(&Url::parse("https://b.example/feed.xml").unwrap()).unwrap();
        assert_eq!(a.body, b"a");
        assert_eq!(b.body, b"b");
    }
}
