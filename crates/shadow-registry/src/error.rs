//! Error types for registry loading and validation

use std::path::PathBuf;

/// Errors raised while loading or validating operation metadata
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registry file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML tables
    #[error("invalid TOML registry: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON tables
    #[error("invalid JSON registry: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed YAML tables
    #[error("invalid YAML registry: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension not recognized
    #[error("unsupported registry format: '{0}'")]
    UnsupportedFormat(String),

    /// Entry is well-formed but contradictory
    #[error("invalid entry for `{name}`: {reason}")]
    InvalidEntry { name: String, reason: String },
}

impl RegistryError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid entry error
    pub fn invalid_entry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
