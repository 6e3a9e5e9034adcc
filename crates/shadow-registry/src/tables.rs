//! Serialized registry tables
//!
//! The on-disk shape mirrors the lookup tables the harness consumes: a rename
//! mapping, two ignore lists, iteration metadata and the sequence name set.
//! TOML, JSON and YAML encodings share the same schema.

use crate::descriptor::IterationMeta;
use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Raw lookup tables as read from a registry file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryTables {
    /// Operations resolved from the chain (sequence) tables
    pub sequence: Vec<String>,

    /// Old name -> new name
    pub rename: BTreeMap<String, String>,

    /// Ignore lists
    pub ignored: IgnoredTables,

    /// Operations taking a per-element callback
    pub iteration: BTreeMap<String, IterationMeta>,
}

/// Operations whose renames or results are never reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IgnoredTables {
    /// Renames not worth reporting
    pub rename: Vec<String>,

    /// Results not worth comparing
    pub result: Vec<String>,
}

/// Encoding of a registry file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl TableFormat {
    /// Detect format from a file extension
    ///
    /// # Errors
    /// Returns [`RegistryError::UnsupportedFormat`] for unknown extensions
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(RegistryError::UnsupportedFormat(ext.to_string())),
        }
    }
}

impl RegistryTables {
    /// Parse tables in the given format
    ///
    /// # Errors
    /// Returns the decoder error for malformed input
    pub fn parse(content: &str, format: TableFormat) -> Result<Self, RegistryError> {
        let tables = match format {
            TableFormat::Toml => toml::from_str(content)?,
            TableFormat::Json => serde_json::from_str(content)?,
            TableFormat::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(tables)
    }

    /// Read and parse a registry file, detecting the format from its extension
    ///
    /// # Errors
    /// Returns IO, format or decoder errors
    pub fn read(path: &Path) -> Result<Self, RegistryError> {
        let format = TableFormat::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| RegistryError::io_error(path, e))?;
        Self::parse(&content, format)
    }
}
