//! Runtime Configuration
//!
//! Tunables for a [`Runtime`](crate::Runtime). Every field has a default,
//! so a config file only needs to name what it changes:
//!
//! ```json
//! { "catch_panics": false }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Contain panics from computation bodies and report them instead of
    /// unwinding through the flush.
    pub catch_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { catch_panics: true }
    }
}

impl RuntimeConfig {
    /// Parse a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}
