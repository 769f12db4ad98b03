pub mod config;
pub mod consent;
pub mod crawler;
pub mod error;
pub mod http;
pub mod plugin;
pub mod plugins;
pub mod scanner;

// Re-export main types for easier access
pub use config::AppConfig;
pub use consent::{ConsentManager, ConsentProvider};
pub use error::{AegisError, AegisResult};
pub use plugin::{
    PluginExecutor,
    PluginFinding,
    PluginRegistry,
    SafetyLevel,
    ScannerPlugin,
};
pub use scanner::{ScanConfiguration, ScanEngine, ScanResult};
