// src/plugin/metadata.rs
use serde::{Deserialize, Serialize};

/// Safety classification bounding how intrusive a plugin's checks may be.
///
/// A plugin never runs when its declared level exceeds the scan's maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SafetyLevel {
    /// Only analyzes existing request/response data.
    Passive,
    /// May send additional safe, non-destructive requests.
    Active,
    /// Advanced testing that may be more intrusive; requires expert mode.
    Expert,
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyLevel::Passive => write!(f, "PASSIVE"),
            SafetyLevel::Active => write!(f, "ACTIVE"),
            SafetyLevel::Expert => write!(f, "EXPERT"),
        }
    }
}

impl std::str::FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passive" => Ok(SafetyLevel::Passive),
            "active" => Ok(SafetyLevel::Active),
            "expert" => Ok(SafetyLevel::Expert),
            other => Err(format!("unknown safety level: {}", other)),
        }
    }
}

/// Identity of a detection plugin. The declared safety level never changes
/// after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub safety_level: SafetyLevel,
}

impl PluginMetadata {
    pub fn new(
        id: &str,
        name: &str,
        version: &str,
        author: &str,
        description: &str,
        safety_level: SafetyLevel,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            author: author.to_string(),
            description: description.to_string(),
            safety_level,
        }
    }
}

/// Advisory resource needs declared by a plugin; used for scheduling
/// decisions, not enforced as a hard contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginCapabilities {
    pub needs_headless_browser: bool,
    pub needs_authentication: bool,
    pub needs_js_execution: bool,
    pub needs_custom_headers: bool,
    pub max_concurrent_requests: usize,
}

impl Default for PluginCapabilities {
    fn default() -> Self {
        Self {
            needs_headless_browser: false,
            needs_authentication: false,
            needs_js_execution: false,
            needs_custom_headers: false,
            max_concurrent_requests: 1,
        }
    }
}
