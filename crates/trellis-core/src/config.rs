//! Store configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable knobs for a store instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Display text given to the lazily materialized root task.
    #[serde(default = "default_root_title")]
    pub root_title: String,
    /// Maximum number of undo entries retained (oldest discarded beyond it).
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_title: default_root_title(),
            undo_limit: default_undo_limit(),
        }
    }
}

fn default_root_title() -> String {
    "Everything".to_string()
}

const fn default_undo_limit() -> usize {
    crate::undo::DEFAULT_UNDO_LIMIT
}

impl StoreConfig {
    /// Parse a TOML document; absent keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not valid TOML.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse store config")
    }

    /// Load configuration from `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parse config {}", path.display()))
    }
}
