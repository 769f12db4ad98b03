// src/crawler/robots.rs
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::http::HttpGateway;

/// Agent token this scanner matches in robots.txt sections.
const AGENT_TOKEN: &str = "aegis";

/// Per-host robots.txt disallow lists, loaded once per origin and kept for
/// the lifetime of a crawl. Fetch failures leave the host unrestricted.
pub struct RobotsPolicy {
    gateway: Arc<dyn HttpGateway>,
    disallowed: RwLock<HashMap<String, Vec<String>>>,
}

impl RobotsPolicy {
    pub fn new(gateway: Arc<dyn HttpGateway>) -> Self {
        Self {
            gateway,
            disallowed: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch and parse robots.txt for the URL's origin.
    pub async fn load(&self, base: &Url) {
        let host = match base.host_str() {
            Some(host) => host.to_string(),
            None => return,
        };
        let robots_url = match base.join("/robots.txt") {
            Ok(url) => url,
            Err(_) => return,
        };

        match self.gateway.get(&robots_url).await {
            Ok(response) if response.is_success() => {
                let paths = parse_robots_txt(response.body());
                info!(
                    "Parsed robots.txt for {}: {} disallowed paths",
                    host,
                    paths.len()
                );
                self.disallowed.write().insert(host, paths);
            }
            Ok(response) => {
                debug!(
                    "robots.txt for {} returned status {}, no restrictions apply",
                    host,
                    response.status()
                );
            }
            Err(e) => {
                debug!("No robots.txt found for {}: {}", host, e);
            }
        }
    }

    /// Whether the URL's path escapes every recorded disallow prefix for its
    /// host. Unknown hosts are always allowed.
    pub fn is_allowed(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host,
            None => return true,
        };

        let disallowed = self.disallowed.read();
        let paths = match disallowed.get(host) {
            Some(paths) => paths,
            None => return true,
        };

        let path = url.path();
        !paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

fn parse_robots_txt(content: &str) -> Vec<String> {
    let mut disallowed = Vec::new();
    let mut relevant_section = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lower = line.to_lowercase();
        if let Some(agent) = lower.strip_prefix("user-agent:") {
            let agent = agent.trim();
            relevant_section = agent == "*" || agent.contains(AGENT_TOKEN);
        } else if relevant_section && lower.starts_with("disallow:") {
            let path = line["disallow:".len()..].trim();
            if !path.is_empty() {
                disallowed.push(path.to_string());
            }
        }
    }

    disallowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AegisError, AegisResult};
    use crate::http::HttpResponseData;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubGateway {
        body: Option<&'static str>,
        status: u16,
    }

    #[async_trait]
    impl HttpGateway for StubGateway {
        async fn get(&self, _url: &Url) -> AegisResult<HttpResponseData> {
            match self.body {
                Some(body) => Ok(HttpResponseData::new(
                    self.status,
                    "",
                    HashMap::new(),
                    body,
                    Duration::ZERO,
                )),
                None => Err(AegisError::NetworkError("connection refused".to_string())),
            }
        }
    }

    async fn policy_with(body: &'static str) -> RobotsPolicy {
        let policy = RobotsPolicy::new(Arc::new(StubGateway {
            body: Some(body),
            status: 200,
        }));
        policy
            .load(&Url::parse("https://example.com/").unwrap())
            .await;
        policy
    }

    #[tokio::test]
    async fn records_wildcard_disallows() {
        let policy = policy_with("User-agent: *\nDisallow: /private\nDisallow: /tmp\n").await;

        assert!(!policy.is_allowed(&Url::parse("https://example.com/private/x").unwrap()));
        assert!(!policy.is_allowed(&Url::parse("https://example.com/tmp").unwrap()));
        assert!(policy.is_allowed(&Url::parse("https://example.com/public").unwrap()));
    }

    #[tokio::test]
    async fn matches_own_agent_section_only() {
        let policy = policy_with(
            "User-agent: googlebot\nDisallow: /only-google\n\nUser-agent: Aegis\nDisallow: /scanner\n",
        )
        .await;

        assert!(policy.is_allowed(&Url::parse("https://example.com/only-google/x").unwrap()));
        assert!(!policy.is_allowed(&Url::parse("https://example.com/scanner/x").unwrap()));
    }

    #[tokio::test]
    async fn skips_comments_and_blank_lines() {
        let policy = policy_with("# robots\n\nUser-agent: *\n# comment\nDisallow: /private\n").await;

        assert!(!policy.is_allowed(&Url::parse("https://example.com/private").unwrap()));
    }

    #[tokio::test]
    async fn fetch_failure_fails_open() {
        let policy = RobotsPolicy::new(Arc::new(StubGateway {
            body: None,
            status: 200,
        }));
        policy
            .load(&Url::parse("https://example.com/").unwrap())
            .await;

        assert!(policy.is_allowed(&Url::parse("https://example.com/anything").unwrap()));
    }

    #[tokio::test]
    async fn non_success_status_fails_open() {
        let policy = RobotsPolicy::new(Arc::new(StubGateway {
            body: Some("User-agent: *\nDisallow: /"),
            status: 404,
        }));
        policy
            .load(&Url::parse("https://example.com/").unwrap())
            .await;

        assert!(policy.is_allowed(&Url::parse("https://example.com/page").unwrap()));
    }

    #[tokio::test]
    async fn unknown_hosts_are_allowed() {
        let policy = policy_with("User-agent: *\nDisallow: /private\n").await;

        assert!(policy.is_allowed(&Url::parse("https://other.com/private").unwrap()));
    }
}
