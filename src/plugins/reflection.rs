// src/plugins/reflection.rs
use std::sync::Arc;

use async_trait::async_trait;

use crate::plugin::{
    Confidence, Evidence, PluginContext, PluginError, PluginFinding, PluginMetadata, SafetyLevel,
    ScannerPlugin, Severity,
};

const PLUGIN_ID: &str = "reflection-detector";

/// Where in the response a reflected parameter value landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReflectionContext {
    JavaScript,
    Attribute,
    Html,
    Css,
    Text,
}

impl ReflectionContext {
    fn name(self) -> &'static str {
        match self {
            ReflectionContext::JavaScript => "javascript",
            ReflectionContext::Attribute => "attribute",
            ReflectionContext::Html => "html",
            ReflectionContext::Css => "css",
            ReflectionContext::Text => "text",
        }
    }

    fn severity(self) -> Severity {
        match self {
            ReflectionContext::JavaScript | ReflectionContext::Attribute => Severity::High,
            ReflectionContext::Html => Severity::Medium,
            ReflectionContext::Css | ReflectionContext::Text => Severity::Low,
        }
    }

    fn confidence(self) -> Confidence {
        match self {
            // plain text reflection might be intentional
            ReflectionContext::Text => Confidence::Possible,
            _ => Confidence::Likely,
        }
    }
}

/// Detects query parameter values reflected in responses, a potential XSS
/// indicator. Passive: only inspects the already-fetched page.
pub struct ReflectionDetectorPlugin {
    metadata: PluginMetadata,
}

impl ReflectionDetectorPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new(
                PLUGIN_ID,
                "Parameter Reflection Detector",
                "1.0.0",
                "Aegis Team",
                "Detects parameter values reflected in responses",
                SafetyLevel::Passive,
            ),
        }
    }
}

impl Default for ReflectionDetectorPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_reflection(body: &str, index: usize, value_len: usize) -> ReflectionContext {
    let mut start = index.saturating_sub(50);
    while start > 0 && !body.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (index + value_len + 50).min(body.len());
    while end < body.len() && !body.is_char_boundary(end) {
        end += 1;
    }
    let surrounding = body[start..end].to_lowercase();

    if surrounding.contains("<script") {
        ReflectionContext::JavaScript
    } else if surrounding.contains("href=") || surrounding.contains("src=") {
        ReflectionContext::Attribute
    } else if surrounding.contains('<') && surrounding.contains('>') {
        ReflectionContext::Html
    } else if surrounding.contains("style=") {
        ReflectionContext::Css
    } else {
        ReflectionContext::Text
    }
}

fn reflection_snippet(body: &str, index: usize, value_len: usize) -> String {
    crate::plugins::extract_snippet(body, index, value_len + 30)
}

#[async_trait]
impl ScannerPlugin for ReflectionDetectorPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn run(&self, context: Arc<PluginContext>) -> Result<Vec<PluginFinding>, PluginError> {
        let mut findings = Vec::new();

        let params = context.parameters();
        if params.is_empty() {
            return Ok(findings);
        }

        let body = context.response().body();
        if body.is_empty() {
            return Ok(findings);
        }

        for (name, value) in params {
            // very short values produce too many coincidental matches
            if value.len() < 3 {
                continue;
            }

            let Some(index) = body.find(value.as_str()) else {
                continue;
            };

            let reflection = classify_reflection(body, index, value.len());
            findings.push(
                PluginFinding::builder(
                    PLUGIN_ID,
                    "Parameter Reflection Detected",
                    context.target_url().clone(),
                )
                .parameter(name)
                .severity(reflection.severity())
                .confidence(reflection.confidence())
                .description(format!(
                    "Parameter '{}' is reflected in the response ({} context)",
                    name,
                    reflection.name()
                ))
                .evidence(Evidence::response_snippet(
                    reflection_snippet(body, index, value.len()),
                    "response_body",
                ))
                .remediation(
                    "Sanitize and encode all user input before rendering. \
                     Use context-appropriate encoding (HTML, JavaScript, URL)",
                )
                .notes(format!(
                    "Reflection detected in {} context. This is a potential XSS indicator \
                     but requires manual verification.",
                    reflection.name()
                ))
                .build(),
            );
        }

        Ok(findings)
    }
}
