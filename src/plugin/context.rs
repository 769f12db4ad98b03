// src/plugin/context.rs
use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::crawler::{CrawledPage, FormData};
use crate::http::HttpResponseData;
use crate::plugin::metadata::SafetyLevel;
use crate::scanner::ScanConfiguration;

/// Sanitized view of the request that produced a crawled page.
#[derive(Debug, Clone)]
pub struct RequestView {
    method: String,
    uri: Url,
    query_params: HashMap<String, String>,
    secure: bool,
}

impl RequestView {
    fn new(uri: &Url) -> Self {
        let query_params = uri
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Self {
            method: "GET".to_string(),
            uri: uri.clone(),
            query_params,
            secure: uri.scheme().eq_ignore_ascii_case("https"),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

/// Scan-level settings a plugin may consult.
#[derive(Debug, Clone)]
pub struct ScanView {
    scan_id: String,
    max_safety_level: SafetyLevel,
    expert_mode: bool,
    max_crawl_depth: usize,
    rate_limit: f64,
}

impl ScanView {
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn max_safety_level(&self) -> SafetyLevel {
        self.max_safety_level
    }

    pub fn is_expert_mode(&self) -> bool {
        self.expert_mode
    }

    pub fn max_crawl_depth(&self) -> usize {
        self.max_crawl_depth
    }

    pub fn rate_limit(&self) -> f64 {
        self.rate_limit
    }
}

/// Read-only view of one crawled page, created fresh per page and shared
/// across all plugins run against that page.
pub struct PluginContext {
    page: Arc<CrawledPage>,
    request: RequestView,
    scan: ScanView,
}

impl PluginContext {
    pub fn new(page: Arc<CrawledPage>, config: &ScanConfiguration) -> Self {
        let request = RequestView::new(page.url());
        let scan = ScanView {
            scan_id: config.scan_id().to_string(),
            max_safety_level: config.max_safety_level(),
            expert_mode: config.is_expert_mode(),
            max_crawl_depth: config.max_crawl_depth(),
            rate_limit: config.rate_limit(),
        };

        Self {
            page,
            request,
            scan,
        }
    }

    pub fn target_url(&self) -> &Url {
        self.page.url()
    }

    pub fn request(&self) -> &RequestView {
        &self.request
    }

    pub fn response(&self) -> &HttpResponseData {
        self.page.response()
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.request.query_params.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.request.query_params
    }

    pub fn forms(&self) -> &[FormData] {
        self.page.forms()
    }

    pub fn crawl_depth(&self) -> usize {
        self.page.depth()
    }

    pub fn scan(&self) -> &ScanView {
        &self.scan
    }
}
