//! Cache entry and fingerprint types

use crate::features::ctu::FileSummary;
use crate::shared::models::ErrorMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Blake3 digest of everything an analysis result depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of raw bytes
    pub fn compute(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Source content, configuration and the settings that affect results
    pub fn for_analysis(content: &str, cfg: &str, settings_signature: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(content.as_bytes());
        hasher.update(&[0]);
        hasher.update(cfg.as_bytes());
        hasher.update(&[0]);
        hasher.update(settings_signature.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..16.min(self.0.len())])
    }
}

/// Stored result of one file+configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Format version marker
    pub version: u32,

    /// Fingerprint of the inputs the entry was computed from
    pub fingerprint: Fingerprint,

    /// Diagnostics reported for the file+configuration
    pub diagnostics: Vec<ErrorMessage>,

    /// Whole-program summaries keyed by check name
    pub file_infos: BTreeMap<String, FileSummary>,
}

impl CacheEntry {
    pub const VERSION: u32 = 1;

    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            version: Self::VERSION,
            fingerprint,
            diagnostics: Vec::new(),
            file_infos: BTreeMap::new(),
        }
    }

    pub fn is_valid_for(&self, fingerprint: &Fingerprint) -> bool {
        self.version == Self::VERSION && &self.fingerprint == fingerprint
    }
}
