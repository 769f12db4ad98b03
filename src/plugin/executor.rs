// src/plugin/executor.rs
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::plugin::api::ScannerPlugin;
use crate::plugin::context::PluginContext;
use crate::plugin::finding::PluginFinding;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
    Skipped,
}

/// Outcome of one plugin invocation against one page. Exactly one status
/// per invocation; findings are only present on success.
#[derive(Debug, Clone, Serialize)]
pub struct PluginExecutionResult {
    plugin_id: String,
    status: ExecutionStatus,
    findings: Vec<PluginFinding>,
    error: Option<String>,
}

impl PluginExecutionResult {
    pub fn success(plugin_id: &str, findings: Vec<PluginFinding>) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            status: ExecutionStatus::Success,
            findings,
            error: None,
        }
    }

    pub fn error(plugin_id: &str, message: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            status: ExecutionStatus::Error,
            findings: Vec::new(),
            error: Some(message.to_string()),
        }
    }

    pub fn timeout(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            status: ExecutionStatus::Timeout,
            findings: Vec::new(),
            error: Some("Execution timeout".to_string()),
        }
    }

    pub fn skipped(plugin_id: &str, reason: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            status: ExecutionStatus::Skipped,
            findings: Vec::new(),
            error: Some(reason.to_string()),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn findings(&self) -> &[PluginFinding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<PluginFinding> {
        self.findings
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Runs plugins with safety-level gating, a fixed worker pool, per-invocation
/// timeouts, and crash isolation.
#[derive(Clone)]
pub struct PluginExecutor {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl PluginExecutor {
    pub fn new(pool_size: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
            timeout,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT)
    }

    /// Execute one plugin against one page context.
    ///
    /// The plugin body is never entered when its safety level exceeds the
    /// scan's maximum. Timeouts abort the task cooperatively; the underlying
    /// work is not guaranteed to stop immediately but its result is
    /// discarded.
    pub async fn execute(
        &self,
        plugin: Arc<dyn ScannerPlugin>,
        context: Arc<PluginContext>,
    ) -> PluginExecutionResult {
        let metadata = plugin.metadata().clone();
        debug!("Executing plugin: {}", metadata.id);

        if metadata.safety_level > context.scan().max_safety_level() {
            warn!(
                "Plugin {} safety level {} not allowed by scan config",
                metadata.id, metadata.safety_level
            );
            return PluginExecutionResult::skipped(&metadata.id, "Safety level not allowed");
        }

        let permits = self.permits.clone();
        let mut handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.expect("executor pool closed");
            plugin.run(context).await
        });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(findings))) => {
                debug!(
                    "Plugin {} completed with {} findings",
                    metadata.id,
                    findings.len()
                );
                PluginExecutionResult::success(&metadata.id, findings)
            }
            Ok(Ok(Err(e))) => {
                error!("Plugin {} execution failed: {}", metadata.id, e);
                PluginExecutionResult::error(&metadata.id, &e.to_string())
            }
            Ok(Err(join_error)) => {
                error!("Plugin {} crashed: {}", metadata.id, join_error);
                PluginExecutionResult::error(&metadata.id, &join_error.to_string())
            }
            Err(_) => {
                handle.abort();
                error!(
                    "Plugin {} timed out after {:?}",
                    metadata.id, self.timeout
                );
                PluginExecutionResult::timeout(&metadata.id)
            }
        }
    }

    /// Run every plugin against the context concurrently and wait for all of
    /// them to settle. Result order is unspecified.
    pub async fn execute_all(
        &self,
        plugins: &[Arc<dyn ScannerPlugin>],
        context: Arc<PluginContext>,
    ) -> Vec<PluginExecutionResult> {
        let mut handles = Vec::with_capacity(plugins.len());

        for plugin in plugins {
            let executor = self.clone();
            let plugin = plugin.clone();
            let context = context.clone();
            handles.push(tokio::spawn(async move {
                executor.execute(plugin, context).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => error!("Failed to collect plugin result: {}", e),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawledPage;
    use crate::http::HttpResponseData;
    use crate::plugin::api::PluginError;
    use crate::plugin::metadata::{PluginMetadata, SafetyLevel};
    use crate::scanner::ScanConfiguration;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    enum Behavior {
        Findings(usize),
        Fail(&'static str),
        Panic,
        Sleep(Duration),
    }

    struct TestPlugin {
        metadata: PluginMetadata,
        behavior: Behavior,
        entered: Arc<AtomicUsize>,
    }

    impl TestPlugin {
        fn new(id: &str, level: SafetyLevel, behavior: Behavior) -> (Arc<dyn ScannerPlugin>, Arc<AtomicUsize>) {
            let entered = Arc::new(AtomicUsize::new(0));
            let plugin = Arc::new(Self {
                metadata: PluginMetadata::new(id, id, "1.0.0", "tests", "", level),
                behavior,
                entered: entered.clone(),
            });
            (plugin, entered)
        }
    }

    #[async_trait]
    impl ScannerPlugin for TestPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        async fn run(
            &self,
            context: Arc<PluginContext>,
        ) -> Result<Vec<PluginFinding>, PluginError> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Findings(count) => Ok((0..*count)
                    .map(|i| {
                        PluginFinding::confirmed(
                            &self.metadata.id,
                            &format!("finding {}", i),
                            context.target_url().clone(),
                        )
                        .build()
                    })
                    .collect()),
                Behavior::Fail(message) => Err(PluginError::new(*message)),
                Behavior::Panic => panic!("detection logic blew up"),
                Behavior::Sleep(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn context(max_level: SafetyLevel) -> Arc<PluginContext> {
        let url = Url::parse("https://example.com/").unwrap();
        let page = Arc::new(CrawledPage::new(
            url.clone(),
            HttpResponseData::new(200, "OK", HashMap::new(), "", Duration::ZERO),
            0,
            Vec::new(),
        ));
        let config = ScanConfiguration::builder(url)
            .max_safety_level(max_level)
            .build();
        Arc::new(PluginContext::new(page, &config))
    }

    #[tokio::test]
    async fn gates_on_safety_level_without_entering_plugin() {
        let executor = PluginExecutor::with_defaults();
        let (plugin, entered) = TestPlugin::new("expert", SafetyLevel::Expert, Behavior::Findings(1));

        let result = executor.execute(plugin, context(SafetyLevel::Passive)).await;

        assert_eq!(result.status(), ExecutionStatus::Skipped);
        assert_eq!(result.error_message(), Some("Safety level not allowed"));
        assert_eq!(entered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn allowed_plugin_returns_findings() {
        let executor = PluginExecutor::with_defaults();
        let (plugin, entered) = TestPlugin::new("ok", SafetyLevel::Passive, Behavior::Findings(3));

        let result = executor.execute(plugin, context(SafetyLevel::Passive)).await;

        assert!(result.is_success());
        assert_eq!(result.findings().len(), 3);
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_isolated_as_error_result() {
        let executor = PluginExecutor::with_defaults();
        let (plugin, _) = TestPlugin::new("broken", SafetyLevel::Passive, Behavior::Fail("boom"));

        let result = executor.execute(plugin, context(SafetyLevel::Passive)).await;

        assert_eq!(result.status(), ExecutionStatus::Error);
        assert!(result.error_message().unwrap().contains("boom"));
        assert!(result.findings().is_empty());
    }

    #[tokio::test]
    async fn panic_is_isolated_as_error_result() {
        let executor = PluginExecutor::with_defaults();
        let (plugin, _) = TestPlugin::new("panicky", SafetyLevel::Passive, Behavior::Panic);

        let result = executor.execute(plugin, context(SafetyLevel::Passive)).await;

        assert_eq!(result.status(), ExecutionStatus::Error);
        assert!(!result.error_message().unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeout_does_not_affect_siblings() {
        let executor = PluginExecutor::new(4, Duration::from_millis(100));
        let (slow, _) = TestPlugin::new(
            "slow",
            SafetyLevel::Passive,
            Behavior::Sleep(Duration::from_secs(10)),
        );
        let (fast, _) = TestPlugin::new("fast", SafetyLevel::Passive, Behavior::Findings(2));

        let results = executor
            .execute_all(&[slow, fast], context(SafetyLevel::Passive))
            .await;

        assert_eq!(results.len(), 2);
        let slow_result = results.iter().find(|r| r.plugin_id() == "slow").unwrap();
        let fast_result = results.iter().find(|r| r.plugin_id() == "fast").unwrap();
        assert_eq!(slow_result.status(), ExecutionStatus::Timeout);
        assert!(fast_result.is_success());
        assert_eq!(fast_result.findings().len(), 2);
    }

    #[tokio::test]
    async fn execute_all_settles_every_plugin() {
        let executor = PluginExecutor::with_defaults();
        let (a, _) = TestPlugin::new("a", SafetyLevel::Passive, Behavior::Findings(1));
        let (b, _) = TestPlugin::new("b", SafetyLevel::Passive, Behavior::Fail("nope"));
        let (c, _) = TestPlugin::new("c", SafetyLevel::Expert, Behavior::Findings(1));

        let results = executor
            .execute_all(&[a, b, c], context(SafetyLevel::Active))
            .await;

        assert_eq!(results.len(), 3);
        let statuses: Vec<ExecutionStatus> = results.iter().map(|r| r.status()).collect();
        assert!(statuses.contains(&ExecutionStatus::Success));
        assert!(statuses.contains(&ExecutionStatus::Error));
        assert!(statuses.contains(&ExecutionStatus::Skipped));
    }
}
