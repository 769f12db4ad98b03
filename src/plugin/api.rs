// src/plugin/api.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::plugin::context::PluginContext;
use crate::plugin::finding::PluginFinding;
use crate::plugin::metadata::{PluginCapabilities, PluginMetadata};

/// Failure raised by a plugin's detection logic.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Key/value settings applied to a plugin before first use.
#[derive(Debug, Clone, Default)]
pub struct PluginSettings {
    properties: HashMap<String, Value>,
}

impl PluginSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }
}

/// Contract every detection module implements.
///
/// Detection must be safe and non-destructive within the declared safety
/// level. `run` must tolerate being invoked concurrently with other plugins
/// (not necessarily with itself); shared state belongs behind interior
/// mutability.
#[async_trait]
pub trait ScannerPlugin: Send + Sync {
    /// Identity and declared safety level, fixed for the plugin's lifetime.
    fn metadata(&self) -> &PluginMetadata;

    /// Declared resource needs.
    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::default()
    }

    /// Accept custom settings before first use.
    fn configure(&self, _settings: PluginSettings) {}

    /// Called exactly once by the registry before the plugin is stored.
    fn initialize(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called exactly once by the registry when the plugin is unregistered.
    fn shutdown(&self) {}

    /// Execute the detection logic against one page.
    async fn run(&self, context: Arc<PluginContext>) -> Result<Vec<PluginFinding>, PluginError>;
}
