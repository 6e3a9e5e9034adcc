//! Interception layer
//!
//! [`ShadowSurface`] wraps a reference [`Surface`] and exposes the same
//! [`Dispatch`] contract. Every intercepted call also runs the candidate,
//! reports renames and divergences, and returns the reference result.
//!
//! ```
//! use shadow_core::{install, Dispatch, ResultShape, Surface, Value};
//! use shadow_registry::OperationRegistry;
//!
//! let legacy = Surface::builder("lib", "1.0.0")
//!     .function("size", ResultShape::Unwrapped, |args| {
//!         Ok(Value::from(args[0].as_array().map_or(0, |a| a.len())))
//!     })
//!     .build();
//! let modern = legacy.clone();
//!
//! let shadow = install(legacy, modern, OperationRegistry::new());
//! let size = shadow.call("size", &[Value::array([1, 2, 3])]).unwrap();
//! assert_eq!(size, Value::from(3));
//! ```

use crate::binding::{BindingTable, MethodBinding};
use crate::error::{CallError, ResolutionError};
use crate::invocation::Invocation;
use crate::report::Reporter;
use crate::surface::{call_direct_chained, CallContext, Dispatch, Surface};
use crate::value::{Value, Wrapped};
use dashmap::DashMap;
use shadow_registry::{OperationKind, OperationRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Reference surface wrapped for shadow execution
pub struct ShadowSurface {
    reference: Arc<Surface>,
    candidate: Arc<Surface>,
    registry: Arc<OperationRegistry>,
    reporter: Arc<Reporter>,
    bindings: BindingTable,
}

impl ShadowSurface {
    /// Wrap `reference`
    ///
    /// Every operation the reference serves is served by the wrapper, from
    /// the same table. Each name is bound in the table it was found in, so a
    /// sequence operation the registry does not list is still intercepted,
    /// and a registry sequence name the reference only has as a direct
    /// operation is still reachable on a chain. Direct names the registry
    /// lists as sequence operations are passed through without comparison.
    pub fn install(
        reference: Arc<Surface>,
        candidate: Arc<Surface>,
        registry: Arc<OperationRegistry>,
        reporter: Arc<Reporter>,
    ) -> Self {
        info!(
            reference = %format_args!("{}@{}", reference.label(), reference.version()),
            candidate = %format_args!("{}@{}", candidate.label(), candidate.version()),
            direct = reference.direct_names().count(),
            sequence = reference.sequence_names().count(),
            "shadow surface installed"
        );

        Self {
            reference,
            candidate,
            registry,
            reporter,
            bindings: BindingTable::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn reference(&self) -> &Arc<Surface> {
        &self.reference
    }

    #[inline]
    #[must_use]
    pub fn candidate(&self) -> &Arc<Surface> {
        &self.candidate
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    /// Memoized bindings of this surface
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Binding for `name` in the table the registry assigns it, resolved on
    /// first use
    ///
    /// # Errors
    /// [`ResolutionError::MissingReference`] when the reference lacks `name`
    pub fn binding(&self, name: &str) -> Result<Arc<MethodBinding>, ResolutionError> {
        self.binding_as(name, self.registry.kind(name))
    }

    /// Binding for `name` in the `kind` table, resolved on first use
    ///
    /// # Errors
    /// [`ResolutionError::MissingReference`] when the reference lacks `name`
    /// in that table
    pub fn binding_as(
        &self,
        name: &str,
        kind: OperationKind,
    ) -> Result<Arc<MethodBinding>, ResolutionError> {
        self.bindings.get_or_resolve(
            name,
            kind,
            &self.reference,
            &self.candidate,
            &self.registry,
        )
    }

    fn intercept(
        &self,
        name: &str,
        kind: OperationKind,
        args: &[Value],
        context: &CallContext,
    ) -> Result<Value, CallError> {
        let binding = self.binding_as(name, kind)?;
        let invocation = Invocation::invoke(binding, args, context)?;
        if invocation.report(&self.reporter) {
            debug!(operation = name, "divergence reported");
        }
        Ok(invocation.into_reference_result())
    }
}

impl Dispatch for ShadowSurface {
    fn label(&self) -> &str {
        self.reference.label()
    }

    fn version(&self) -> &str {
        self.reference.version()
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, CallError> {
        if self.reference.lookup(OperationKind::Direct, name).is_none() {
            return Err(CallError::UnknownOperation(name.to_string()));
        }
        if self.registry.is_sequence(name) {
            return self.reference.call(name, args);
        }
        self.intercept(name, OperationKind::Direct, args, &CallContext::direct())
    }

    fn call_chain(
        &self,
        receiver: &Wrapped,
        name: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        // same resolution order as `Surface::call_chain`
        if self.reference.lookup(OperationKind::Sequence, name).is_some() {
            let context = CallContext::chained(receiver.clone());
            return self.intercept(name, OperationKind::Sequence, args, &context);
        }
        if self.reference.lookup(OperationKind::Direct, name).is_none() {
            return Err(CallError::UnknownOperation(name.to_string()));
        }
        call_direct_chained(self, self.reference.shape(name), receiver, name, args)
    }

    fn run_in_context(&self, context: &Value) -> Result<Self, CallError> {
        let rebound = self.reference.run_in_context(context)?;
        Ok(Self::install(
            Arc::new(rebound),
            Arc::clone(&self.candidate),
            Arc::clone(&self.registry),
            Arc::clone(&self.reporter),
        ))
    }
}

impl fmt::Debug for ShadowSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowSurface")
            .field("reference", &self.reference)
            .field("candidate", &self.candidate)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Wrap `reference` against `candidate`, reporting through the global reporter
pub fn install(
    reference: impl Into<Arc<Surface>>,
    candidate: impl Into<Arc<Surface>>,
    registry: impl Into<Arc<OperationRegistry>>,
) -> ShadowSurface {
    ShadowSurface::install(
        reference.into(),
        candidate.into(),
        registry.into(),
        Reporter::global(),
    )
}

type InstallKey = (usize, usize);

/// Installs shadow surfaces at most once per (reference, candidate) pair
pub struct Interceptor {
    registry: Arc<OperationRegistry>,
    reporter: Arc<Reporter>,
    installed: DashMap<InstallKey, Arc<ShadowSurface>>,
}

impl Interceptor {
    /// Interceptor reporting through the global reporter
    #[must_use]
    pub fn new(registry: impl Into<Arc<OperationRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            reporter: Reporter::global(),
            installed: DashMap::new(),
        }
    }

    /// Report through `reporter` instead
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[inline]
    #[must_use]
    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    /// Install `reference` against `candidate`, or return the existing
    /// installation for this pair
    pub fn install(&self, reference: &Arc<Surface>, candidate: &Arc<Surface>) -> Arc<ShadowSurface> {
        let key = (address(reference), address(candidate));
        if let Some(existing) = self.installed.get(&key) {
            return Arc::clone(existing.value());
        }

        let entry = self.installed.entry(key).or_insert_with(|| {
            Arc::new(ShadowSurface::install(
                Arc::clone(reference),
                Arc::clone(candidate),
                Arc::clone(&self.registry),
                Arc::clone(&self.reporter),
            ))
        });
        Arc::clone(entry.value())
    }

    /// Number of installed pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.installed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("installed", &self.installed.len())
            .finish_non_exhaustive()
    }
}

fn address(surface: &Arc<Surface>) -> usize {
    Arc::as_ptr(surface) as usize
}
