// src/consent.rs
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::{AegisError, AegisResult};

/// Authorization check consulted before any scan starts.
#[cfg_attr(test, mockall::automock)]
pub trait ConsentProvider: Send + Sync {
    fn has_valid_consent(&self, target: &Url) -> bool;
}

/// Authorization record permitting scans of one origin for a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub target: Url,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl ConsentRecord {
    /// Consent is scoped to the origin: host and scheme must match.
    pub fn covers(&self, target: &Url) -> bool {
        self.target.host_str().is_some()
            && self.target.host_str() == target.host_str()
            && self.target.scheme() == target.scheme()
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.granted_at <= now && now < self.expires_at
    }
}

/// In-memory store of consent records imported from signed documents.
#[derive(Default)]
pub struct ConsentManager {
    records: RwLock<Vec<ConsentRecord>>,
}

impl ConsentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&self, record: ConsentRecord) {
        self.records.write().push(record);
    }

    /// Import a consent document (JSON) from disk.
    pub fn load_consent_from_file(&self, path: &Path) -> AegisResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| AegisError::FileError {
            path: path.to_path_buf(),
            message: format!("Failed to read consent document: {}", e),
        })?;

        let record: ConsentRecord = serde_json::from_str(&content)?;
        info!(
            "Loaded consent for {} (expires {})",
            record.target, record.expires_at
        );
        self.records.write().push(record);

        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

impl ConsentProvider for ConsentManager {
    fn has_valid_consent(&self, target: &Url) -> bool {
        let now = Utc::now();
        let valid = self
            .records
            .read()
            .iter()
            .any(|record| record.covers(target) && record.is_active(now));

        if !valid {
            warn!("No valid consent for target: {}", target);
        }
        valid
    }
}
