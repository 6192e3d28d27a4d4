//! Per-host robots.txt cache. Each host's robots.txt is fetched at most
//! once per run and cached behind a `DashMap`; hosts with no robots.txt
//! (or an unparseable one) are treated as allow-all.

use dashmap::DashMap;
use reqwest::Client;
use texting_robots::{get_robots_url, Robot};
use tracing::debug;
use url::Url;

use crate::fetch::USER_AGENT;

pub struct RobotsCache {
    client: Client,
    cache: DashMap<String, Option<Robot>>,
}

impl RobotsCache {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }

    pub async fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else { return true };
        let host = host.to_string();

        if let Some(entry) = self.cache.get(&host) {
            return entry.as_ref().map(|r| r.allowed(url.as_str())).unwrap_or(true);
        }

        let robot = self.load(url).await;
        let allowed = robot.as_ref().map(|r| r.allowed(url.as_str())).unwrap_or(true);
        self.cache.insert(host, robot);
        allowed
    }

    async fn load(&self, url: &Url) -> Option<Robot> {
        let robots_url = get_robots_url(url.as_str()).ok()?;
        let body = self.client.get(robots_url.as_str()).send().await.ok()?.bytes().await.ok()?;
        match Robot::new(USER_AGENT, &body) {
            Ok(robot) => Some(robot),
            Err(e) => {
                debug!(url = %url, error = %e, "robots.txt failed to parse, treating as allow-all");
                None
            }
        }
    }
}
