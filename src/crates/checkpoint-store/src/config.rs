//! Store configuration
//!
//! ```toml
//! # page size used by `list` when the caller passes no limit
//! default_limit = 50
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Configuration for [`InMemoryCheckpointSaver`](crate::memory::InMemoryCheckpointSaver)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SaverConfig {
    /// Limit applied to `list` when the caller passes none; unbounded if unset
    #[serde(default)]
    pub default_limit: Option<usize>,
}

impl SaverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML, filling missing keys with defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// Resolve the effective limit for a `list` call; `0` means unbounded
    pub(crate) fn effective_limit(&self, requested: Option<usize>) -> Option<usize> {
        requested
            .or(self.default_limit)
            .filter(|limit| *limit > 0)
    }
}
