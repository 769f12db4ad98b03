// src/http/client.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{AegisError, AegisResult};
use crate::http::rate_limit::RateLimiter;

pub const USER_AGENT: &str = concat!(
    "aegis/",
    env!("CARGO_PKG_VERSION"),
    " (Protection-First Security Scanner)"
);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable snapshot of one HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponseData {
    status: u16,
    reason: String,
    headers: HashMap<String, Vec<String>>,
    body: String,
    response_time_ms: u64,
}

impl HttpResponseData {
    pub fn new(
        status: u16,
        reason: impl Into<String>,
        headers: HashMap<String, Vec<String>>,
        body: impl Into<String>,
        response_time: Duration,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers,
            body: body.into(),
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &HashMap<String, Vec<String>> {
        &self.headers
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values of a header, matched case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_truncated(&self, max_length: usize) -> String {
        if self.body.len() <= max_length {
            return self.body.clone();
        }
        let mut end = max_length;
        while !self.body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &self.body[..end])
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Boundary through which all outbound requests flow.
#[async_trait]
pub trait HttpGateway: Send + Sync {
    async fn get(&self, url: &Url) -> AegisResult<HttpResponseData>;
}

/// Rate-limited reqwest client implementing the gateway.
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpClient {
    pub fn new(requests_per_second: f64) -> AegisResult<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(requests_per_second)?);

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AegisError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initialized HTTP client with rate limit: {} req/s",
            requests_per_second
        );

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        self.rate_limiter.clone()
    }
}

#[async_trait]
impl HttpGateway for HttpClient {
    async fn get(&self, url: &Url) -> AegisResult<HttpResponseData> {
        self.rate_limiter.acquire().await;

        debug!("GET {}", url);
        let start = Instant::now();

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("HTTP request failed for {}: {}", url, e);
            AegisError::NetworkError(e.to_string())
        })?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();

        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read response body from {}: {}", url, e);
                String::new()
            }
        };

        Ok(HttpResponseData::new(
            status.as_u16(),
            reason,
            headers,
            body,
            start.elapsed(),
        ))
    }
}
