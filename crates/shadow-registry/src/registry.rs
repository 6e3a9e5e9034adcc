//! Operation registry
//!
//! Provides [`OperationRegistry`], an enumerable mapping from operation name to
//! [`OperationDescriptor`]. It is built once from [`RegistryTables`] and then
//! only read.

use crate::descriptor::{IterationMeta, OperationDescriptor, OperationKind};
use crate::error::RegistryError;
use crate::tables::{RegistryTables, TableFormat};
use std::collections::BTreeMap;
use std::path::Path;

const LODASH_MIGRATION: &str = include_str!("../data/lodash-v3-v4.toml");

/// Registry of per-operation metadata
///
/// Names without an entry behave as plain direct operations: no rename, not
/// ignored, no iteration metadata.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationRegistry {
    descriptors: BTreeMap<String, OperationDescriptor>,
}

impl OperationRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// Build descriptors from raw tables
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidEntry`] for empty or self-referential
    /// renames and for iteration metadata on sequence operations
    pub fn from_tables(tables: RegistryTables) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for name in tables.sequence {
            registry.entry(&name).kind = OperationKind::Sequence;
        }

        for (name, target) in tables.rename {
            if target.trim().is_empty() {
                return Err(RegistryError::invalid_entry(name, "empty rename target"));
            }
            if target == name {
                return Err(RegistryError::invalid_entry(name, "renamed to itself"));
            }
            registry.entry(&name).rename = Some(target);
        }

        for name in tables.ignored.rename {
            registry.entry(&name).ignore_rename = true;
        }

        for name in tables.ignored.result {
            registry.entry(&name).ignore_result = true;
        }

        for (name, meta) in tables.iteration {
            let entry = registry.entry(&name);
            if entry.kind == OperationKind::Sequence {
                return Err(RegistryError::invalid_entry(
                    name,
                    "sequence operations take no iteratee",
                ));
            }
            entry.iteration = Some(meta);
        }

        Ok(registry)
    }

    /// Parse tables in the given format and build the registry
    ///
    /// # Errors
    /// Returns decoder or validation errors
    pub fn parse(content: &str, format: TableFormat) -> Result<Self, RegistryError> {
        Self::from_tables(RegistryTables::parse(content, format)?)
    }

    /// Load a registry file (`.toml`, `.json`, `.yaml`)
    ///
    /// # Errors
    /// Returns IO, decoder or validation errors
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        Self::from_tables(RegistryTables::read(path.as_ref())?)
    }

    /// Built-in metadata for comparing lodash v3 against lodash v4
    ///
    /// # Errors
    /// Only fails if the embedded table is malformed
    pub fn lodash_migration() -> Result<Self, RegistryError> {
        Self::parse(LODASH_MIGRATION, TableFormat::Toml)
    }

    fn entry(&mut self, name: &str) -> &mut OperationDescriptor {
        self.descriptors
            .entry(name.to_string())
            .or_insert_with(|| OperationDescriptor::direct(name))
    }

    /// Register a rename
    #[must_use]
    pub fn with_rename(mut self, name: &str, target: &str) -> Self {
        self.entry(name).rename = Some(target.to_string());
        self
    }

    /// Mark an operation as a sequence (chain) operation
    #[must_use]
    pub fn with_sequence(mut self, name: &str) -> Self {
        self.entry(name).kind = OperationKind::Sequence;
        self
    }

    /// Never report the rename of an operation
    #[must_use]
    pub fn with_ignored_rename(mut self, name: &str) -> Self {
        self.entry(name).ignore_rename = true;
        self
    }

    /// Never compare results of an operation
    #[must_use]
    pub fn with_ignored_result(mut self, name: &str) -> Self {
        self.entry(name).ignore_result = true;
        self
    }

    /// Attach iteration metadata
    #[must_use]
    pub fn with_iteration(mut self, name: &str, meta: IterationMeta) -> Self {
        self.entry(name).iteration = Some(meta);
        self
    }

    /// Get the descriptor registered for `name`
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.descriptors.get(name)
    }

    /// Get the descriptor for `name`, falling back to a plain direct operation
    #[must_use]
    pub fn describe(&self, name: &str) -> OperationDescriptor {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| OperationDescriptor::direct(name))
    }

    /// Kind of `name` (direct unless listed as a sequence operation)
    #[inline]
    #[must_use]
    pub fn kind(&self, name: &str) -> OperationKind {
        self.get(name).map_or(OperationKind::Direct, |d| d.kind)
    }

    /// Whether `name` is in the sequence set
    #[inline]
    #[must_use]
    pub fn is_sequence(&self, name: &str) -> bool {
        self.kind(name) == OperationKind::Sequence
    }

    /// Rename target of `name`
    #[inline]
    #[must_use]
    pub fn rename_target(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|d| d.rename.as_deref())
    }

    /// Whether renames of `name` are ignored
    #[inline]
    #[must_use]
    pub fn ignores_rename(&self, name: &str) -> bool {
        self.get(name).is_some_and(|d| d.ignore_rename)
    }

    /// Whether results of `name` are ignored
    #[inline]
    #[must_use]
    pub fn ignores_result(&self, name: &str) -> bool {
        self.get(name).is_some_and(|d| d.ignore_result)
    }

    /// Iteration metadata of `name`
    #[inline]
    #[must_use]
    pub fn iteration(&self, name: &str) -> Option<IterationMeta> {
        self.get(name).and_then(|d| d.iteration)
    }

    /// Names in the sequence set
    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors
            .values()
            .filter(|d| d.kind == OperationKind::Sequence)
            .map(|d| d.name.as_str())
    }

    /// Iterate over all descriptors, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.descriptors.values()
    }

    /// Number of names with metadata
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
