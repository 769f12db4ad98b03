// src/plugin/registry.rs
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{AegisError, AegisResult};
use crate::plugin::api::ScannerPlugin;
use crate::plugin::metadata::SafetyLevel;

/// Externally packaged set of plugins plus the loading context that keeps
/// them alive. Dropping the last handle releases the context.
pub trait PluginPackage: Send + Sync {
    fn name(&self) -> &str;

    /// Enumerate the plugin implementations contained in this package.
    fn discover(&self) -> Vec<Box<dyn ScannerPlugin>>;
}

/// Holds the registered detection plugins and the loading contexts of
/// dynamically loaded packages.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<dyn ScannerPlugin>>>,
    packages: Mutex<HashMap<String, Arc<dyn PluginPackage>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin instance, running its initialization hook first.
    ///
    /// Re-registering an id replaces the previous instance without invoking
    /// its shutdown hook; callers replacing plugins on purpose must shut the
    /// old instance down themselves.
    pub fn register(&self, plugin: Box<dyn ScannerPlugin>) -> AegisResult<String> {
        let metadata = plugin.metadata().clone();

        if self.plugins.read().contains_key(&metadata.id) {
            warn!("Plugin {} already registered, replacing", metadata.id);
        }

        plugin.initialize().map_err(|e| {
            AegisError::PluginError(format!("Failed to initialize plugin {}: {}", metadata.id, e))
        })?;

        self.plugins
            .write()
            .insert(metadata.id.clone(), Arc::from(plugin));
        info!(
            "Registered plugin: {} v{} [{}]",
            metadata.id, metadata.version, metadata.safety_level
        );

        Ok(metadata.id)
    }

    /// Load every plugin found in an external package, keeping the package
    /// handle alive until its plugins are unregistered.
    pub fn load_package(&self, package: Box<dyn PluginPackage>) -> AegisResult<Vec<String>> {
        info!("Loading plugin package: {}", package.name());

        let discovered = package.discover();
        if discovered.is_empty() {
            warn!("No scanner plugins found in package {}", package.name());
            return Err(AegisError::PluginError(format!(
                "No scanner plugins found in package {}",
                package.name()
            )));
        }

        let package: Arc<dyn PluginPackage> = Arc::from(package);
        let mut ids = Vec::new();
        for plugin in discovered {
            let id = self.register(plugin)?;
            self.packages.lock().insert(id.clone(), package.clone());
            ids.push(id);
        }

        Ok(ids)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ScannerPlugin>> {
        self.plugins.read().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn ScannerPlugin>> {
        self.plugins.read().values().cloned().collect()
    }

    /// All plugins whose declared safety level does not exceed `max_level`.
    pub fn by_max_safety_level(&self, max_level: SafetyLevel) -> Vec<Arc<dyn ScannerPlugin>> {
        self.plugins
            .read()
            .values()
            .filter(|plugin| plugin.metadata().safety_level <= max_level)
            .cloned()
            .collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.read().len()
    }

    /// Remove a plugin, run its shutdown hook, and release any loading
    /// context associated with it.
    pub fn unregister(&self, id: &str) {
        let plugin = self.plugins.write().remove(id);
        if let Some(plugin) = plugin {
            plugin.shutdown();
            info!("Unregistered plugin: {}", id);
        }
        self.packages.lock().remove(id);
    }

    /// Unregister every plugin.
    pub fn shutdown(&self) {
        info!("Shutting down plugin registry");
        let ids: Vec<String> = self.plugins.read().keys().cloned().collect();
        for id in ids {
            self.unregister(&id);
        }
    }
}
