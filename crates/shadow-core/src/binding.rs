//! Method binding
//!
//! A [`MethodBinding`] pairs the reference and candidate operations that
//! implement one name, together with the registry metadata that governs how
//! they are compared. Bindings are resolved lazily and memoized in a
//! [`BindingTable`], one per shadow surface.

use crate::error::{CallError, ResolutionError};
use crate::report::RenameNotice;
use crate::surface::{CallContext, Dispatch, Operation, Surface};
use crate::value::Value;
use dashmap::DashMap;
use shadow_registry::{IterationMeta, OperationKind, OperationRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Resolved operation pair plus comparison metadata
///
/// Immutable once built.
#[derive(Clone)]
pub struct MethodBinding {
    name: String,
    kind: OperationKind,
    candidate_name: String,
    reference_fn: Operation,
    candidate_fn: Option<Operation>,
    was_renamed: bool,
    ignore_rename: bool,
    ignore_differences: bool,
    iteration: Option<IterationMeta>,
    reference_version: String,
    candidate_version: String,
}

impl MethodBinding {
    /// Resolve `name` on both surfaces in the table the registry assigns it
    ///
    /// A missing candidate operation is tolerated: the binding then never
    /// compares.
    ///
    /// # Errors
    /// [`ResolutionError::MissingReference`] when the reference lacks `name`
    pub fn resolve(
        name: &str,
        reference: &Surface,
        candidate: &Surface,
        registry: &OperationRegistry,
    ) -> Result<Self, ResolutionError> {
        Self::resolve_as(name, registry.kind(name), reference, candidate, registry)
    }

    /// Resolve `name` in the `kind` table of both surfaces
    ///
    /// Renames, ignore flags and iteration metadata still come from the
    /// registry.
    ///
    /// # Errors
    /// [`ResolutionError::MissingReference`] when the reference lacks `name`
    /// in that table
    pub fn resolve_as(
        name: &str,
        kind: OperationKind,
        reference: &Surface,
        candidate: &Surface,
        registry: &OperationRegistry,
    ) -> Result<Self, ResolutionError> {
        let descriptor = registry.describe(name);

        let reference_fn = reference
            .lookup(kind, name)
            .cloned()
            .ok_or_else(|| ResolutionError::missing_reference(reference.label(), kind, name))?;

        let candidate_name = descriptor.candidate_name().to_string();
        let candidate_fn = candidate.lookup(kind, &candidate_name).cloned();

        debug!(
            operation = name,
            %kind,
            candidate = %candidate_name,
            has_candidate = candidate_fn.is_some(),
            "resolved binding"
        );

        Ok(Self {
            name: descriptor.name.clone(),
            kind,
            was_renamed: descriptor.was_renamed(),
            ignore_rename: descriptor.ignore_rename,
            ignore_differences: descriptor.ignore_result,
            iteration: descriptor.iteration,
            candidate_name,
            reference_fn,
            candidate_fn,
            reference_version: reference.version().to_string(),
            candidate_version: candidate.version().to_string(),
        })
    }

    /// Name as called
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name on the reference surface
    #[inline]
    #[must_use]
    pub fn reference_name(&self) -> &str {
        &self.name
    }

    /// Name on the candidate surface
    #[inline]
    #[must_use]
    pub fn candidate_name(&self) -> &str {
        &self.candidate_name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn was_renamed(&self) -> bool {
        self.was_renamed
    }

    #[inline]
    #[must_use]
    pub fn ignore_rename(&self) -> bool {
        self.ignore_rename
    }

    /// Whether only the reference runs
    #[inline]
    #[must_use]
    pub fn ignore_differences(&self) -> bool {
        self.ignore_differences
    }

    #[inline]
    #[must_use]
    pub fn iteration(&self) -> Option<IterationMeta> {
        self.iteration
    }

    /// Whether the candidate surface has this operation
    #[inline]
    #[must_use]
    pub fn has_candidate(&self) -> bool {
        self.candidate_fn.is_some()
    }

    #[inline]
    #[must_use]
    pub fn reference_version(&self) -> &str {
        &self.reference_version
    }

    #[inline]
    #[must_use]
    pub fn candidate_version(&self) -> &str {
        &self.candidate_version
    }

    /// Whether the callback in the iteratee slot must be replaced by identity
    /// before the candidate call
    ///
    /// Only iteration operations are affected, and only when the slot holds a
    /// function. A mappable operation keeps a callback that declares a
    /// significant return value; every other callback is replaced so its side
    /// effects run once.
    #[must_use]
    pub fn needs_identity(&self, slot: Option<&Value>) -> bool {
        let Some(meta) = self.iteration else {
            return false;
        };
        let Some(Value::Function(callback)) = slot else {
            return false;
        };
        !(meta.mappable && callback.returns_value())
    }

    /// Rename notice, unless there is no rename or it is ignored
    #[must_use]
    pub fn rename_notice(&self) -> Option<RenameNotice> {
        (self.was_renamed && !self.ignore_rename).then(|| RenameNotice {
            name: self.name.clone(),
            old_name: self.name.clone(),
            new_name: self.candidate_name.clone(),
            old_version: self.reference_version.clone(),
            new_version: self.candidate_version.clone(),
        })
    }

    pub(crate) fn call_reference(
        &self,
        context: &CallContext,
        args: &[Value],
    ) -> Result<Value, CallError> {
        (self.reference_fn)(context, args)
    }

    pub(crate) fn candidate_fn(&self) -> Option<&Operation> {
        self.candidate_fn.as_ref()
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("candidate_name", &self.candidate_name)
            .field("has_candidate", &self.has_candidate())
            .field("was_renamed", &self.was_renamed)
            .field("ignore_rename", &self.ignore_rename)
            .field("ignore_differences", &self.ignore_differences)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

/// Memo of bindings by table and operation name
///
/// Lookups and inserts are atomic per key; no shard lock is held once a
/// binding has been returned.
#[derive(Default)]
pub struct BindingTable {
    bindings: DashMap<(OperationKind, String), Arc<MethodBinding>>,
}

impl BindingTable {
    /// Create empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized binding for `name` in the `kind` table, resolving
    /// it on first use
    ///
    /// # Errors
    /// Propagates [`MethodBinding::resolve_as`] failures; nothing is memoized then
    pub fn get_or_resolve(
        &self,
        name: &str,
        kind: OperationKind,
        reference: &Surface,
        candidate: &Surface,
        registry: &OperationRegistry,
    ) -> Result<Arc<MethodBinding>, ResolutionError> {
        let key = (kind, name.to_string());
        if let Some(binding) = self.bindings.get(&key) {
            return Ok(Arc::clone(binding.value()));
        }

        let entry = self.bindings.entry(key).or_try_insert_with(|| {
            MethodBinding::resolve_as(name, kind, reference, candidate, registry).map(Arc::new)
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Memoized binding for `name`, direct table first
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<MethodBinding>> {
        [OperationKind::Direct, OperationKind::Sequence]
            .into_iter()
            .find_map(|kind| self.get_kind(kind, name))
    }

    /// Memoized binding for `name` in the `kind` table
    #[must_use]
    pub fn get_kind(&self, kind: OperationKind, name: &str) -> Option<Arc<MethodBinding>> {
        self.bindings
            .get(&(kind, name.to_string()))
            .map(|b| Arc::clone(b.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTable")
            .field("len", &self.bindings.len())
            .finish()
    }
}
