// src/plugin/finding.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Severity of a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// How certain the detection logic is about a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Possible,
    Likely,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceType {
    ResponseSnippet,
    HeaderValue,
    PatternMatch,
    TimingData,
    BehaviorObservation,
    ConfigurationIssue,
}

/// Sanitized excerpt or observation supporting a finding.
///
/// Must not contain sensitive data (credentials, tokens, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceType,
    pub snippet: String,
    pub context: Option<String>,
    pub description: Option<String>,
}

impl Evidence {
    pub fn response_snippet(snippet: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind: EvidenceType::ResponseSnippet,
            snippet: snippet.into(),
            context: Some(context.into()),
            description: None,
        }
    }

    pub fn header_value(snippet: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind: EvidenceType::HeaderValue,
            snippet: snippet.into(),
            context: Some(context.into()),
            description: None,
        }
    }

    pub fn pattern_match(snippet: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: EvidenceType::PatternMatch,
            snippet: snippet.into(),
            context: None,
            description: Some(description.into()),
        }
    }

    pub fn timing_data(snippet: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: EvidenceType::TimingData,
            snippet: snippet.into(),
            context: None,
            description: Some(description.into()),
        }
    }
}

/// A single reported potential vulnerability. Write-once after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginFinding {
    pub finding_id: String,
    pub plugin_id: String,
    pub endpoint: Url,
    pub parameter: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub confidence: Confidence,
    pub evidence: Vec<Evidence>,
    pub remediation: Option<String>,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PluginFinding {
    pub fn builder(plugin_id: &str, title: &str, endpoint: Url) -> FindingBuilder {
        FindingBuilder::new(plugin_id, title, endpoint)
    }

    /// Shorthand for POSSIBLE confidence findings.
    pub fn possible(plugin_id: &str, title: &str, endpoint: Url) -> FindingBuilder {
        FindingBuilder::new(plugin_id, title, endpoint).confidence(Confidence::Possible)
    }

    /// Shorthand for LIKELY confidence findings.
    pub fn likely(plugin_id: &str, title: &str, endpoint: Url) -> FindingBuilder {
        FindingBuilder::new(plugin_id, title, endpoint).confidence(Confidence::Likely)
    }

    /// Shorthand for CONFIRMED confidence findings.
    pub fn confirmed(plugin_id: &str, title: &str, endpoint: Url) -> FindingBuilder {
        FindingBuilder::new(plugin_id, title, endpoint).confidence(Confidence::Confirmed)
    }
}

pub struct FindingBuilder {
    plugin_id: String,
    endpoint: Url,
    parameter: Option<String>,
    title: String,
    description: Option<String>,
    severity: Severity,
    confidence: Confidence,
    evidence: Vec<Evidence>,
    remediation: Option<String>,
    notes: Option<String>,
}

impl FindingBuilder {
    fn new(plugin_id: &str, title: &str, endpoint: Url) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            endpoint,
            parameter: None,
            title: title.to_string(),
            description: None,
            severity: Severity::Low,
            confidence: Confidence::Possible,
            evidence: Vec::new(),
            remediation: None,
            notes: None,
        }
    }

    pub fn parameter(mut self, parameter: &str) -> Self {
        self.parameter = Some(parameter.to_string());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> PluginFinding {
        PluginFinding {
            finding_id: Uuid::new_v4().to_string(),
            plugin_id: self.plugin_id,
            endpoint: self.endpoint,
            parameter: self.parameter,
            title: self.title,
            description: self.description,
            severity: self.severity,
            confidence: self.confidence,
            evidence: self.evidence,
            remediation: self.remediation,
            notes: self.notes,
            timestamp: Utc::now(),
        }
    }
}
