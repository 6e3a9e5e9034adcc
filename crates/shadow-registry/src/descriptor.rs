//! Operation descriptors
//!
//! Provides [`OperationDescriptor`], the per-name metadata record consumed by
//! method binding, together with [`OperationKind`] and [`IterationMeta`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which table of an implementation surface an operation lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Called directly with its arguments
    #[default]
    Direct,

    /// Called on a chain wrapper; the wrapper is the call context
    Sequence,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Sequence => f.write_str("sequence"),
        }
    }
}

/// Iteration metadata for operations that take a per-element callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationMeta {
    /// Whether the callback's return value feeds into the result
    ///
    /// A mappable operation keeps the caller's callback for the candidate
    /// call when that callback declares a significant return value.
    pub mappable: bool,

    /// Argument position of the callback
    #[serde(default = "IterationMeta::default_iteratee_index")]
    pub iteratee_index: usize,
}

impl IterationMeta {
    /// Callback position used by collection operations (`op(collection, iteratee)`)
    pub const DEFAULT_ITERATEE_INDEX: usize = 1;

    /// Create metadata for a mappable operation
    #[inline]
    #[must_use]
    pub const fn mappable() -> Self {
        Self {
            mappable: true,
            iteratee_index: Self::DEFAULT_ITERATEE_INDEX,
        }
    }

    /// Create metadata for an operation whose callback result is discarded
    #[inline]
    #[must_use]
    pub const fn effect_only() -> Self {
        Self {
            mappable: false,
            iteratee_index: Self::DEFAULT_ITERATEE_INDEX,
        }
    }

    /// Set the callback position
    #[inline]
    #[must_use]
    pub const fn at(mut self, iteratee_index: usize) -> Self {
        self.iteratee_index = iteratee_index;
        self
    }

    const fn default_iteratee_index() -> usize {
        Self::DEFAULT_ITERATEE_INDEX
    }
}

/// Everything the registry knows about one operation name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Canonical name as called on the reference surface
    pub name: String,

    /// Direct or sequence table
    pub kind: OperationKind,

    /// Name of the same operation on the candidate surface, if different
    pub rename: Option<String>,

    /// Never report the rename of this operation
    pub ignore_rename: bool,

    /// Never compare results of this operation (the candidate is not called)
    pub ignore_result: bool,

    /// Callback metadata for iteration operations
    pub iteration: Option<IterationMeta>,
}

impl OperationDescriptor {
    /// Descriptor for a name the registry has no entry for
    #[must_use]
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Direct,
            rename: None,
            ignore_rename: false,
            ignore_result: false,
            iteration: None,
        }
    }

    /// Name to resolve on the candidate surface
    #[inline]
    #[must_use]
    pub fn candidate_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    /// Whether a rename entry exists
    #[inline]
    #[must_use]
    pub fn was_renamed(&self) -> bool {
        self.rename.is_some()
    }

    /// Whether the rename should be reported
    #[inline]
    #[must_use]
    pub fn reports_rename(&self) -> bool {
        self.was_renamed() && !self.ignore_rename
    }
}
