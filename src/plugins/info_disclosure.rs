// src/plugins/info_disclosure.rs
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::plugin::{
    Evidence, PluginContext, PluginError, PluginFinding, PluginMetadata, SafetyLevel,
    ScannerPlugin, Severity,
};
use crate::plugins::extract_snippet;

const PLUGIN_ID: &str = "info-disclosure";

static SERVER_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Apache|nginx|IIS|Tomcat|Jetty)/([0-9.]+)").unwrap());

static STACK_TRACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(at\s+[a-zA-Z0-9_.]+\([^)]+\)|Exception in thread|Caused by:|Stack trace:)")
        .unwrap()
});

static SQL_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(SQL syntax|mysql_fetch|PostgreSQL.*ERROR|ORA-[0-9]+|Microsoft SQL Server)")
        .unwrap()
});

/// Detects information leakage in responses. Passive: only analyzes existing
/// response data.
pub struct InfoDisclosurePlugin {
    metadata: PluginMetadata,
}

impl InfoDisclosurePlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new(
                PLUGIN_ID,
                "Information Disclosure Detector",
                "1.0.0",
                "Aegis Team",
                "Detects information leakage in responses",
                SafetyLevel::Passive,
            ),
        }
    }
}

impl Default for InfoDisclosurePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScannerPlugin for InfoDisclosurePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn run(&self, context: Arc<PluginContext>) -> Result<Vec<PluginFinding>, PluginError> {
        let mut findings = Vec::new();
        let response = context.response();
        let endpoint = context.target_url();

        if let Some(server) = response.header("Server") {
            if SERVER_VERSION.is_match(server) {
                findings.push(
                    PluginFinding::confirmed(
                        PLUGIN_ID,
                        "Server Version Disclosure",
                        endpoint.clone(),
                    )
                    .severity(Severity::Low)
                    .description("Server header reveals software version")
                    .evidence(Evidence::header_value(server, "Server"))
                    .remediation("Configure server to hide version information")
                    .build(),
                );
            }
        }

        if let Some(powered_by) = response.header("X-Powered-By") {
            findings.push(
                PluginFinding::confirmed(
                    PLUGIN_ID,
                    "X-Powered-By Header Disclosure",
                    endpoint.clone(),
                )
                .severity(Severity::Low)
                .description("X-Powered-By header reveals technology stack")
                .evidence(Evidence::header_value(powered_by, "X-Powered-By"))
                .remediation("Remove or disable X-Powered-By header")
                .build(),
            );
        }

        let body = response.body();
        if !body.is_empty() {
            if let Some(m) = STACK_TRACE.find(body) {
                findings.push(
                    PluginFinding::confirmed(
                        PLUGIN_ID,
                        "Stack Trace Disclosure",
                        endpoint.clone(),
                    )
                    .severity(Severity::Medium)
                    .description("Response contains stack trace information")
                    .evidence(Evidence::response_snippet(
                        extract_snippet(body, m.start(), 100),
                        "response_body",
                    ))
                    .remediation("Configure error handling to show generic error pages")
                    .notes("Stack traces can reveal internal application structure")
                    .build(),
                );
            }

            if let Some(m) = SQL_ERROR.find(body) {
                findings.push(
                    PluginFinding::confirmed(
                        PLUGIN_ID,
                        "SQL Error Message Disclosure",
                        endpoint.clone(),
                    )
                    .severity(Severity::Medium)
                    .description("Response contains SQL error messages")
                    .evidence(Evidence::response_snippet(
                        extract_snippet(body, m.start(), 100),
                        "response_body",
                    ))
                    .remediation("Implement proper error handling and logging")
                    .notes("SQL errors can aid SQL injection attacks")
                    .build(),
                );
            }

            if body.contains("DEBUG") || body.contains("TRACE") || body.contains("development mode")
            {
                findings.push(
                    PluginFinding::likely(
                        PLUGIN_ID,
                        "Debug Information Disclosure",
                        endpoint.clone(),
                    )
                    .severity(Severity::Low)
                    .description("Response may contain debug information")
                    .evidence(Evidence::pattern_match(
                        "Debug indicators found",
                        "response_body",
                    ))
                    .remediation("Disable debug mode in production")
                    .build(),
                );
            }
        }

        Ok(findings)
    }
}
