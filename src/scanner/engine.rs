// src/scanner/engine.rs
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::consent::ConsentProvider;
use crate::crawler::WebCrawler;
use crate::error::{AegisError, AegisResult};
use crate::http::{HttpClient, HttpGateway};
use crate::plugin::{PluginContext, PluginExecutor, PluginFinding, PluginRegistry};
use crate::scanner::config::ScanConfiguration;
use crate::scanner::result::{ExecutionTally, ScanResult};

/// Orchestrates consent validation, crawling, plugin fan-out, and result
/// aggregation for one scan at a time.
pub struct ScanEngine {
    consent: Arc<dyn ConsentProvider>,
    registry: Arc<PluginRegistry>,
    executor: PluginExecutor,
    gateway: Option<Arc<dyn HttpGateway>>,
}

impl ScanEngine {
    pub fn new(consent: Arc<dyn ConsentProvider>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            consent,
            registry,
            executor: PluginExecutor::with_defaults(),
            gateway: None,
        }
    }

    pub fn with_executor(mut self, executor: PluginExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Use a custom transport instead of constructing the rate-limited
    /// default client.
    pub fn with_gateway(mut self, gateway: Arc<dyn HttpGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Execute a scan with the given configuration.
    ///
    /// Failures below the scan level are absorbed into the result; only
    /// missing consent, transport construction failure, and other scan-level
    /// failures surface as errors.
    pub async fn scan(&self, config: ScanConfiguration) -> AegisResult<ScanResult> {
        info!("Starting scan: {}", config.scan_id());

        if !self.consent.has_valid_consent(config.target_url()) {
            return Err(AegisError::ConsentError(format!(
                "No valid consent for target: {}",
                config.target_url()
            )));
        }

        let mut result = ScanResult::new(&config);

        match self.run_phases(&config, &mut result).await {
            Ok(()) => {
                result.complete();
                info!(
                    "Scan completed: {} findings across {} pages",
                    result.finding_count(),
                    result.crawl_result().map(|c| c.page_count()).unwrap_or(0)
                );
                Ok(result)
            }
            Err(e) => {
                error!("Scan failed: {}", e);
                result.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        config: &ScanConfiguration,
        result: &mut ScanResult,
    ) -> AegisResult<()> {
        let gateway: Arc<dyn HttpGateway> = match &self.gateway {
            Some(gateway) => gateway.clone(),
            None => Arc::new(HttpClient::new(config.rate_limit())?),
        };

        let crawler = WebCrawler::new(gateway, config.crawl_config());
        let crawl_result = crawler.crawl().await;
        crawler.shutdown().await;
        info!("Crawl completed: {} pages", crawl_result.page_count());

        let plugins = self.registry.by_max_safety_level(config.max_safety_level());
        info!("Running {} plugins", plugins.len());

        let pages = crawl_result.pages();
        result.set_crawl_result(crawl_result);

        let findings: Arc<Mutex<Vec<PluginFinding>>> = Arc::new(Mutex::new(Vec::new()));
        let tally = Arc::new(Mutex::new(ExecutionTally::default()));

        let mut page_tasks = JoinSet::new();
        for page in pages {
            let context = Arc::new(PluginContext::new(page, config));
            let plugins = plugins.clone();
            let executor = self.executor.clone();
            let findings = findings.clone();
            let tally = tally.clone();

            page_tasks.spawn(async move {
                let results = executor.execute_all(&plugins, context).await;
                for plugin_result in results {
                    tally.lock().record(&plugin_result);
                    if plugin_result.is_success() {
                        findings.lock().extend(plugin_result.into_findings());
                    }
                }
            });
        }

        while let Some(joined) = page_tasks.join_next().await {
            if let Err(e) = joined {
                error!("Page scan task failed: {}", e);
            }
        }

        result.add_findings(
            Arc::try_unwrap(findings)
                .expect("page tasks still hold the findings")
                .into_inner(),
        );
        result.set_tally(
            Arc::try_unwrap(tally)
                .expect("page tasks still hold the tally")
                .into_inner(),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::MockConsentProvider;
    use crate::http::HttpResponseData;
    use crate::plugin::{
        PluginError, PluginMetadata, SafetyLevel, ScannerPlugin,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    struct MapGateway {
        pages: HashMap<String, String>,
        hits: Mutex<usize>,
    }

    impl MapGateway {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                hits: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpGateway for MapGateway {
        async fn get(&self, url: &Url) -> AegisResult<HttpResponseData> {
            *self.hits.lock() += 1;
            let body = self.pages.get(url.as_str()).cloned().unwrap_or_default();
            let mut headers = HashMap::new();
            headers.insert("Content-Type".to_string(), vec!["text/html".to_string()]);
            Ok(HttpResponseData::new(200, "OK", headers, body, Duration::ZERO))
        }
    }

    struct FixedPlugin {
        metadata: PluginMetadata,
        findings_per_page: usize,
        fail: bool,
        entered: Arc<AtomicUsize>,
    }

    impl FixedPlugin {
        fn new(id: &str, level: SafetyLevel, findings_per_page: usize, fail: bool) -> Box<Self> {
            Box::new(Self {
                metadata: PluginMetadata::new(id, id, "1.0.0", "tests", "", level),
                findings_per_page,
                fail,
                entered: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl ScannerPlugin for FixedPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        async fn run(
            &self,
            context: Arc<PluginContext>,
        ) -> Result<Vec<PluginFinding>, PluginError> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PluginError::new("detection failed"));
            }
            Ok((0..self.findings_per_page)
                .map(|i| {
                    PluginFinding::likely(
                        &self.metadata.id,
                        &format!("issue {}", i),
                        context.target_url().clone(),
                    )
                    .build()
                })
                .collect())
        }
    }

    fn config(target: &str, level: SafetyLevel) -> ScanConfiguration {
        ScanConfiguration::builder(Url::parse(target).unwrap())
            .max_safety_level(level)
            .respect_robots_txt(false)
            .build()
    }

    #[tokio::test]
    async fn rejects_scan_without_consent() {
        let mut consent = MockConsentProvider::new();
        consent.expect_has_valid_consent().return_const(false);

        let gateway = Arc::new(MapGateway::new(&[]));
        let engine = ScanEngine::new(Arc::new(consent), Arc::new(PluginRegistry::new()))
            .with_gateway(gateway.clone());

        let result = engine
            .scan(config("https://example.com/", SafetyLevel::Passive))
            .await;

        assert!(matches!(result, Err(AegisError::ConsentError(_))));
        assert_eq!(*gateway.hits.lock(), 0);
    }

    #[tokio::test]
    async fn aggregates_findings_across_pages_and_plugins() {
        let mut consent = MockConsentProvider::new();
        consent.expect_has_valid_consent().return_const(true);

        let gateway = Arc::new(MapGateway::new(&[
            (
                "https://example.com/",
                r#"<a href="/a">a</a><a href="/b">b</a>"#,
            ),
            ("https://example.com/a", "leaf a"),
            ("https://example.com/b", "leaf b"),
        ]));

        let registry = Arc::new(PluginRegistry::new());
        registry
            .register(FixedPlugin::new("finder", SafetyLevel::Passive, 2, false))
            .unwrap();
        registry
            .register(FixedPlugin::new("flaky", SafetyLevel::Passive, 0, true))
            .unwrap();
        registry
            .register(FixedPlugin::new("intrusive", SafetyLevel::Expert, 5, false))
            .unwrap();

        let engine = ScanEngine::new(Arc::new(consent), registry).with_gateway(gateway);
        let result = engine
            .scan(config("https://example.com/", SafetyLevel::Active))
            .await
            .unwrap();

        // 3 pages x 2 findings from the one succeeding, allowed plugin
        assert_eq!(result.finding_count(), 6);
        assert!(result
            .findings()
            .iter()
            .all(|finding| finding.plugin_id == "finder"));

        let crawl = result.crawl_result().unwrap();
        assert_eq!(crawl.page_count(), 3);

        // every finding endpoint is a crawled page
        for finding in result.findings() {
            assert!(crawl.page(&finding.endpoint).is_some());
        }

        let tally = result.tally();
        assert_eq!(tally.counts().get("finder").unwrap().success, 3);
        assert_eq!(tally.counts().get("flaky").unwrap().error, 3);
        // safety-filtered plugins never reach the executor
        assert!(!tally.counts().contains_key("intrusive"));
        assert_eq!(tally.total_errors(), 3);

        assert!(!result.has_error());
        assert!(result.end_time().is_some());
    }

    #[tokio::test]
    async fn invalid_rate_limit_is_a_scan_level_failure() {
        let mut consent = MockConsentProvider::new();
        consent.expect_has_valid_consent().return_const(true);

        let engine = ScanEngine::new(Arc::new(consent), Arc::new(PluginRegistry::new()));
        let config = ScanConfiguration::builder(Url::parse("https://example.com/").unwrap())
            .rate_limit(0.0)
            .build();

        let result = engine.scan(config).await;
        assert!(matches!(result, Err(AegisError::InvalidInput(_))));
    }
}
