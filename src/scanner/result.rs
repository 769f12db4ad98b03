// src/scanner/result.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crawler::CrawlResult;
use crate::plugin::{ExecutionStatus, PluginExecutionResult, PluginFinding, Severity};
use crate::scanner::config::ScanConfiguration;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub success: usize,
    pub error: usize,
    pub timeout: usize,
    pub skipped: usize,
}

/// Per-plugin counts of execution outcomes across all pages; the visible
/// per-plugin error surface of a scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionTally {
    counts: HashMap<String, StatusCounts>,
}

impl ExecutionTally {
    pub fn record(&mut self, result: &PluginExecutionResult) {
        let counts = self.counts.entry(result.plugin_id().to_string()).or_default();
        match result.status() {
            ExecutionStatus::Success => counts.success += 1,
            ExecutionStatus::Error => counts.error += 1,
            ExecutionStatus::Timeout => counts.timeout += 1,
            ExecutionStatus::Skipped => counts.skipped += 1,
        }
    }

    pub fn counts(&self) -> &HashMap<String, StatusCounts> {
        &self.counts
    }

    pub fn total_errors(&self) -> usize {
        self.counts
            .values()
            .map(|counts| counts.error + counts.timeout)
            .sum()
    }
}

/// Outcome of a whole scan, finalized when the scan completes or fails.
#[derive(Debug)]
pub struct ScanResult {
    scan_id: String,
    target: url::Url,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    crawl_result: Option<CrawlResult>,
    findings: Vec<PluginFinding>,
    tally: ExecutionTally,
    error: Option<String>,
}

impl ScanResult {
    pub fn new(config: &ScanConfiguration) -> Self {
        Self {
            scan_id: config.scan_id().to_string(),
            target: config.target_url().clone(),
            start_time: Utc::now(),
            end_time: None,
            crawl_result: None,
            findings: Vec::new(),
            tally: ExecutionTally::default(),
            error: None,
        }
    }

    pub(crate) fn set_crawl_result(&mut self, crawl_result: CrawlResult) {
        self.crawl_result = Some(crawl_result);
    }

    pub(crate) fn add_findings(&mut self, findings: Vec<PluginFinding>) {
        self.findings.extend(findings);
    }

    pub(crate) fn set_tally(&mut self, tally: ExecutionTally) {
        self.tally = tally;
    }

    pub(crate) fn complete(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.end_time = Some(Utc::now());
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn target(&self) -> &url::Url {
        &self.target
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn duration_ms(&self) -> i64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds()
    }

    pub fn crawl_result(&self) -> Option<&CrawlResult> {
        self.crawl_result.as_ref()
    }

    pub fn findings(&self) -> &[PluginFinding] {
        &self.findings
    }

    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    pub fn findings_by_severity(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn tally(&self) -> &ExecutionTally {
        &self.tally
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serializable view of the scan outcome for report export.
    pub fn report(&self) -> ScanReport {
        let (page_count, crawl_errors) = match &self.crawl_result {
            Some(crawl) => (
                crawl.page_count(),
                crawl
                    .errors()
                    .into_iter()
                    .map(|(url, error)| (url.to_string(), error))
                    .collect(),
            ),
            None => (0, HashMap::new()),
        };

        ScanReport {
            scan_id: self.scan_id.clone(),
            target: self.target.to_string(),
            started_at: self.start_time,
            completed_at: self.end_time,
            duration_ms: self.duration_ms(),
            page_count,
            crawl_errors,
            findings: self.findings.clone(),
            execution_tally: self.tally.clone(),
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub page_count: usize,
    pub crawl_errors: HashMap<String, String>,
    pub findings: Vec<PluginFinding>,
    pub execution_tally: ExecutionTally,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn tally_counts_statuses_per_plugin() {
        let mut tally = ExecutionTally::default();
        tally.record(&PluginExecutionResult::success("a", Vec::new()));
        tally.record(&PluginExecutionResult::success("a", Vec::new()));
        tally.record(&PluginExecutionResult::error("a", "boom"));
        tally.record(&PluginExecutionResult::timeout("b"));
        tally.record(&PluginExecutionResult::skipped("c", "safety"));

        let a = tally.counts().get("a").unwrap();
        assert_eq!((a.success, a.error), (2, 1));
        assert_eq!(tally.counts().get("b").unwrap().timeout, 1);
        assert_eq!(tally.counts().get("c").unwrap().skipped, 1);
        assert_eq!(tally.total_errors(), 2);
    }

    #[test]
    fn completion_stamps_end_time() {
        let config =
            ScanConfiguration::builder(Url::parse("https://example.com/").unwrap()).build();
        let mut result = ScanResult::new(&config);
        assert!(result.end_time().is_none());

        result.complete();
        assert!(result.end_time().is_some());
        assert!(!result.has_error());
        assert!(result.duration_ms() >= 0);
    }

    #[test]
    fn failure_records_error_and_end_time() {
        let config =
            ScanConfiguration::builder(Url::parse("https://example.com/").unwrap()).build();
        let mut result = ScanResult::new(&config);

        result.fail("transport construction failed".to_string());

        assert!(result.has_error());
        assert!(result.end_time().is_some());
        assert_eq!(result.error(), Some("transport construction failed"));
    }
}
