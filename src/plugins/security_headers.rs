// src/plugins/security_headers.rs
use std::sync::Arc;

use async_trait::async_trait;

use crate::plugin::{
    Evidence, PluginContext, PluginError, PluginFinding, PluginMetadata, SafetyLevel,
    ScannerPlugin, Severity,
};

const PLUGIN_ID: &str = "security-headers";

/// Detects missing or misconfigured security headers. Passive: only analyzes
/// responses the crawler already fetched.
pub struct SecurityHeadersPlugin {
    metadata: PluginMetadata,
}

impl SecurityHeadersPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new(
                PLUGIN_ID,
                "Security Headers Checker",
                "1.0.0",
                "Aegis Team",
                "Checks for missing or misconfigured security headers",
                SafetyLevel::Passive,
            ),
        }
    }

    fn check_cookies(&self, context: &PluginContext, findings: &mut Vec<PluginFinding>) {
        for cookie in context.response().header_values("Set-Cookie") {
            let lower = cookie.to_lowercase();
            let excerpt: String = cookie.chars().take(50).collect();

            if context.request().is_secure() && !lower.contains("secure") {
                findings.push(
                    PluginFinding::confirmed(
                        PLUGIN_ID,
                        "Cookie Missing Secure Flag",
                        context.target_url().clone(),
                    )
                    .severity(Severity::Medium)
                    .description("Cookie set without Secure flag on HTTPS connection")
                    .evidence(Evidence::header_value(excerpt.clone(), "Set-Cookie"))
                    .remediation("Add 'Secure' flag to all cookies on HTTPS")
                    .build(),
                );
            }

            if !lower.contains("httponly") {
                findings.push(
                    PluginFinding::likely(
                        PLUGIN_ID,
                        "Cookie Missing HttpOnly Flag",
                        context.target_url().clone(),
                    )
                    .severity(Severity::Low)
                    .description("Cookie set without HttpOnly flag")
                    .evidence(Evidence::header_value(excerpt.clone(), "Set-Cookie"))
                    .remediation("Add 'HttpOnly' flag to cookies that don't need JavaScript access")
                    .build(),
                );
            }

            if !lower.contains("samesite") {
                findings.push(
                    PluginFinding::possible(
                        PLUGIN_ID,
                        "Cookie Missing SameSite Attribute",
                        context.target_url().clone(),
                    )
                    .severity(Severity::Low)
                    .description("Cookie set without SameSite attribute")
                    .evidence(Evidence::header_value(excerpt, "Set-Cookie"))
                    .remediation("Add 'SameSite=Strict' or 'SameSite=Lax' to cookies")
                    .notes("SameSite helps prevent CSRF attacks")
                    .build(),
                );
            }
        }
    }
}

impl Default for SecurityHeadersPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScannerPlugin for SecurityHeadersPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn run(&self, context: Arc<PluginContext>) -> Result<Vec<PluginFinding>, PluginError> {
        let mut findings = Vec::new();
        let response = context.response();
        let endpoint = context.target_url();

        if context.request().is_secure() && response.header("Strict-Transport-Security").is_none() {
            findings.push(
                PluginFinding::confirmed(PLUGIN_ID, "Missing HSTS Header", endpoint.clone())
                    .severity(Severity::Medium)
                    .description(
                        "The Strict-Transport-Security header is not set on this HTTPS endpoint",
                    )
                    .evidence(Evidence::header_value("Missing", "Strict-Transport-Security"))
                    .remediation(
                        "Add 'Strict-Transport-Security: max-age=31536000; includeSubDomains' header",
                    )
                    .build(),
            );
        }

        if response.header("X-Content-Type-Options").is_none() {
            findings.push(
                PluginFinding::confirmed(
                    PLUGIN_ID,
                    "Missing X-Content-Type-Options",
                    endpoint.clone(),
                )
                .severity(Severity::Low)
                .description("The X-Content-Type-Options header is not set")
                .evidence(Evidence::header_value("Missing", "X-Content-Type-Options"))
                .remediation("Add 'X-Content-Type-Options: nosniff' header")
                .build(),
            );
        }

        if response.header("X-Frame-Options").is_none()
            && response.header("Content-Security-Policy").is_none()
        {
            findings.push(
                PluginFinding::likely(
                    PLUGIN_ID,
                    "Missing Clickjacking Protection",
                    endpoint.clone(),
                )
                .severity(Severity::Medium)
                .description("Neither X-Frame-Options nor CSP frame-ancestors directive is set")
                .evidence(Evidence::header_value("Missing", "X-Frame-Options and CSP"))
                .remediation(
                    "Add 'X-Frame-Options: DENY' or 'Content-Security-Policy: frame-ancestors 'none''",
                )
                .build(),
            );
        }

        if response.header("Content-Security-Policy").is_none() {
            findings.push(
                PluginFinding::possible(
                    PLUGIN_ID,
                    "Missing Content Security Policy",
                    endpoint.clone(),
                )
                .severity(Severity::Low)
                .description("No Content-Security-Policy header detected")
                .evidence(Evidence::header_value("Missing", "Content-Security-Policy"))
                .remediation("Implement a Content-Security-Policy appropriate for your application")
                .notes("CSP helps prevent XSS and other injection attacks")
                .build(),
            );
        }

        self.check_cookies(&context, &mut findings);

        Ok(findings)
    }
}
