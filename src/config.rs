// src/config.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::FileFormat;
use serde::{Deserialize, Serialize};

use crate::error::{AegisError, AegisResult};
use crate::plugin::SafetyLevel;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Application configuration: global settings plus named scan profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub global: GlobalConfig,
    pub profiles: HashMap<String, ScanProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub default_profile: String,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    num_cpus::get()
}

/// Scan parameter defaults, overridable per invocation by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProfile {
    pub max_crawl_depth: usize,
    pub rate_limit: f64,
    pub concurrency: usize,
    pub max_safety_level: SafetyLevel,
    pub plugin_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration: embedded defaults, then the user config file,
    /// then AEGIS_* environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path));
        } else {
            let default_path = Self::default_config_path();
            if default_path.exists() {
                builder = builder.add_source(config::File::from(default_path.as_path()));
            }
        }

        builder = builder.add_source(config::Environment::with_prefix("AEGIS"));

        builder
            .build()?
            .try_deserialize()
            .context("Failed to load configuration")
    }

    /// Resolve a profile by name, falling back to the configured default.
    pub fn profile(&self, name: Option<&str>) -> AegisResult<&ScanProfile> {
        let name = name.unwrap_or(&self.global.default_profile);
        self.profiles
            .get(name)
            .ok_or_else(|| AegisError::ConfigError(format!("Unknown profile: {}", name)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aegis/config.toml")
    }
}
