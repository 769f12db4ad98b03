// src/scanner/config.rs
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::crawler::CrawlConfig;
use crate::plugin::SafetyLevel;

/// Immutable parameters for one scan. Built once before the scan starts.
#[derive(Debug, Clone, Serialize)]
pub struct ScanConfiguration {
    scan_id: String,
    target_url: Url,
    max_safety_level: SafetyLevel,
    max_crawl_depth: usize,
    rate_limit: f64,
    concurrency: usize,
    respect_robots_txt: bool,
    expert_mode: bool,
}

impl ScanConfiguration {
    pub fn builder(target_url: Url) -> ScanConfigurationBuilder {
        ScanConfigurationBuilder {
            scan_id: None,
            target_url,
            max_safety_level: SafetyLevel::Passive,
            max_crawl_depth: 10,
            rate_limit: 5.0,
            concurrency: 2,
            respect_robots_txt: true,
            expert_mode: false,
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    pub fn max_safety_level(&self) -> SafetyLevel {
        self.max_safety_level
    }

    pub fn max_crawl_depth(&self) -> usize {
        self.max_crawl_depth
    }

    pub fn rate_limit(&self) -> f64 {
        self.rate_limit
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn respects_robots_txt(&self) -> bool {
        self.respect_robots_txt
    }

    pub fn is_expert_mode(&self) -> bool {
        self.expert_mode
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            seed: self.target_url.clone(),
            max_depth: self.max_crawl_depth,
            concurrency: self.concurrency,
            respect_robots_txt: self.respect_robots_txt,
        }
    }
}

pub struct ScanConfigurationBuilder {
    scan_id: Option<String>,
    target_url: Url,
    max_safety_level: SafetyLevel,
    max_crawl_depth: usize,
    rate_limit: f64,
    concurrency: usize,
    respect_robots_txt: bool,
    expert_mode: bool,
}

impl ScanConfigurationBuilder {
    pub fn scan_id(mut self, scan_id: &str) -> Self {
        self.scan_id = Some(scan_id.to_string());
        self
    }

    pub fn max_safety_level(mut self, level: SafetyLevel) -> Self {
        self.max_safety_level = level;
        self
    }

    pub fn max_crawl_depth(mut self, depth: usize) -> Self {
        self.max_crawl_depth = depth;
        self
    }

    pub fn rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn respect_robots_txt(mut self, respect: bool) -> Self {
        self.respect_robots_txt = respect;
        self
    }

    pub fn expert_mode(mut self, enabled: bool) -> Self {
        self.expert_mode = enabled;
        self
    }

    pub fn build(self) -> ScanConfiguration {
        ScanConfiguration {
            scan_id: self
                .scan_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            target_url: self.target_url,
            max_safety_level: self.max_safety_level,
            max_crawl_depth: self.max_crawl_depth,
            rate_limit: self.rate_limit,
            concurrency: self.concurrency,
            respect_robots_txt: self.respect_robots_txt,
            expert_mode: self.expert_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ScanConfiguration::builder(Url::parse("https://example.com/").unwrap()).build();

        assert!(!config.scan_id().is_empty());
        assert_eq!(config.max_safety_level(), SafetyLevel::Passive);
        assert_eq!(config.max_crawl_depth(), 10);
        assert_eq!(config.rate_limit(), 5.0);
        assert_eq!(config.concurrency(), 2);
        assert!(config.respects_robots_txt());
        assert!(!config.is_expert_mode());
    }

    #[test]
    fn builder_overrides_stick() {
        let config = ScanConfiguration::builder(Url::parse("https://example.com/").unwrap())
            .scan_id("scan-1")
            .max_safety_level(SafetyLevel::Expert)
            .max_crawl_depth(3)
            .rate_limit(1.5)
            .concurrency(8)
            .respect_robots_txt(false)
            .expert_mode(true)
            .build();

        assert_eq!(config.scan_id(), "scan-1");
        assert_eq!(config.max_safety_level(), SafetyLevel::Expert);

        let crawl = config.crawl_config();
        assert_eq!(crawl.max_depth, 3);
        assert_eq!(crawl.concurrency, 8);
        assert!(!crawl.respect_robots_txt);
    }
}
