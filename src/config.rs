//! Configuration for the export resolver.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for header validation and the export scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum bytes examined when probing or reading an export name.
    /// A name without a terminator inside this bound counts as unreadable.
    pub max_name_len: usize,
    /// Upper limit on the number of export entries scanned.
    pub max_exports: usize,
    /// Check header structures and export arrays against `SizeOfImage`.
    pub enforce_image_bounds: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_name_len: 512,
            max_exports: 65536,
            enforce_image_bounds: false,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    pub fn with_max_exports(mut self, count: usize) -> Self {
        self.max_exports = count;
        self
    }

    pub fn with_image_bounds(mut self, enforce: bool) -> Self {
        self.enforce_image_bounds = enforce;
        self
    }
}
