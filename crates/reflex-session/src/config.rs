use std::path::Path;

use serde::{Deserialize, Serialize};

use reflex_model::DEFAULT_EMBEDDING_LIMIT;

use crate::error::ConfigResult;

/// What `find` does when a candidate document cannot be classified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindErrorPolicy {
    /// Log a warning and leave the document out of the result.
    #[default]
    Skip,
    /// Fail the whole query with the first error.
    Abort,
}

/// Configuration for an [`InMemorySession`](crate::InMemorySession).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Keep resolved schemas until the next write.
    pub cache_schemas: bool,
    /// Maximum depth of embedded instantiation.
    pub embedding_limit: usize,
    /// Handling of per-document failures in `find`.
    pub find_errors: FindErrorPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_schemas: true,
            embedding_limit: DEFAULT_EMBEDDING_LIMIT,
            find_errors: FindErrorPolicy::Skip,
        }
    }
}

impl SessionConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }
}
