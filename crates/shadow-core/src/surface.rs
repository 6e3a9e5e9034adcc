//! Implementation surfaces
//!
//! A [`Surface`] is an explicit, enumerable table of named operations. Direct
//! operations are called with their arguments; sequence operations are called
//! on a chain wrapper, which reaches them through the [`CallContext`].
//!
//! Both raw surfaces and shadow surfaces implement [`Dispatch`], so callers
//! cannot tell them apart.

use crate::compare::DeepCloner;
use crate::error::CallError;
use crate::value::{Value, Wrapped};
use indexmap::IndexMap;
use shadow_registry::OperationKind;
use std::fmt;
use std::sync::Arc;

/// Operation body
pub type Operation = Arc<dyn Fn(&CallContext, &[Value]) -> Result<Value, CallError> + Send + Sync>;

/// Builds a surface rebound to a new context (`run_in_context`)
pub type ContextFactory = Arc<dyn Fn(&Value) -> Result<Surface, CallError> + Send + Sync>;

/// How a direct operation's result comes back when called on a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// Chainable: the result is always re-wrapped
    #[default]
    Wrapped,
    /// Terminal: re-wrapped only on an explicit chain
    Unwrapped,
    /// Re-wrapped on an explicit chain or when extra arguments are given
    Varies,
}

impl ResultShape {
    /// Whether a chained result must be re-wrapped
    #[inline]
    #[must_use]
    pub fn rewraps(self, chain_all: bool, extra_args: bool) -> bool {
        match self {
            Self::Wrapped => true,
            Self::Unwrapped => chain_all,
            Self::Varies => chain_all || extra_args,
        }
    }
}

/// Receiver of a call (`this`)
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    receiver: Option<Wrapped>,
}

impl CallContext {
    /// Context of a direct call
    #[inline]
    #[must_use]
    pub fn direct() -> Self {
        Self::default()
    }

    /// Context of a call on a chain wrapper
    #[inline]
    #[must_use]
    pub fn chained(receiver: Wrapped) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    #[inline]
    #[must_use]
    pub fn receiver(&self) -> Option<&Wrapped> {
        self.receiver.as_ref()
    }

    /// Value held by the receiver, `undefined` for direct calls
    #[must_use]
    pub fn receiver_value(&self) -> Value {
        self.receiver
            .as_ref()
            .map(|w| w.value().clone())
            .unwrap_or_default()
    }

    /// Whether the receiver is an explicit chain
    #[inline]
    #[must_use]
    pub fn chain_all(&self) -> bool {
        self.receiver.as_ref().is_some_and(Wrapped::chain_all)
    }

    /// Copy of this context whose receiver shares nothing with the original
    pub fn deep_clone_with(&self, cloner: &mut DeepCloner) -> Self {
        Self {
            receiver: self
                .receiver
                .as_ref()
                .map(|w| Wrapped::new(cloner.clone_value(w.value()), w.chain_all())),
        }
    }
}

#[derive(Clone)]
struct DirectEntry {
    op: Operation,
    shape: ResultShape,
}

/// Named operation tables of one implementation
#[derive(Clone)]
pub struct Surface {
    label: String,
    version: String,
    direct: IndexMap<String, DirectEntry>,
    sequence: IndexMap<String, Operation>,
    context_factory: Option<ContextFactory>,
}

impl Surface {
    /// Start building a surface
    #[must_use]
    pub fn builder(label: &str, version: &str) -> SurfaceBuilder {
        SurfaceBuilder {
            surface: Self {
                label: label.to_string(),
                version: version.to_string(),
                direct: IndexMap::new(),
                sequence: IndexMap::new(),
                context_factory: None,
            },
        }
    }

    /// Find an operation in the table for `kind`
    #[must_use]
    pub fn lookup(&self, kind: OperationKind, name: &str) -> Option<&Operation> {
        match kind {
            OperationKind::Direct => self.direct.get(name).map(|e| &e.op),
            OperationKind::Sequence => self.sequence.get(name),
        }
    }

    /// Chain result shape of a direct operation
    #[must_use]
    pub fn shape(&self, name: &str) -> ResultShape {
        self.direct.get(name).map(|e| e.shape).unwrap_or_default()
    }

    /// Direct operation names in registration order
    pub fn direct_names(&self) -> impl Iterator<Item = &str> {
        self.direct.keys().map(String::as_str)
    }

    /// Sequence operation names in registration order
    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.sequence.keys().map(String::as_str)
    }

    /// Whether the surface can be rebound
    #[inline]
    #[must_use]
    pub fn has_context_factory(&self) -> bool {
        self.context_factory.is_some()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("label", &self.label)
            .field("version", &self.version)
            .field("direct", &self.direct.keys().collect::<Vec<_>>())
            .field("sequence", &self.sequence.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Surface`]
pub struct SurfaceBuilder {
    surface: Surface,
}

impl SurfaceBuilder {
    /// Register a chainable direct operation
    #[must_use]
    pub fn op<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&CallContext, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.op_with_shape(name, ResultShape::Wrapped, f)
    }

    /// Register a direct operation with an explicit chain result shape
    #[must_use]
    pub fn op_with_shape<F>(mut self, name: &str, shape: ResultShape, f: F) -> Self
    where
        F: Fn(&CallContext, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.surface.direct.insert(
            name.to_string(),
            DirectEntry {
                op: Arc::new(f),
                shape,
            },
        );
        self
    }

    /// Register a direct operation that ignores its call context
    #[must_use]
    pub fn function<F>(self, name: &str, shape: ResultShape, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.op_with_shape(name, shape, move |_, args| f(args))
    }

    /// Register a sequence operation
    #[must_use]
    pub fn sequence<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&CallContext, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.surface.sequence.insert(name.to_string(), Arc::new(f));
        self
    }

    /// Register the rebinding factory
    #[must_use]
    pub fn context_factory<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Surface, CallError> + Send + Sync + 'static,
    {
        self.surface.context_factory = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn build(self) -> Surface {
        self.surface
    }
}

/// Calling contract shared by raw and shadow surfaces
pub trait Dispatch: Send + Sync {
    /// Surface label (e.g. library name)
    fn label(&self) -> &str;

    /// Version used in messages
    fn version(&self) -> &str;

    /// Call a direct operation
    ///
    /// # Errors
    /// [`CallError::UnknownOperation`] or whatever the operation raises
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, CallError>;

    /// Call an operation on a chain wrapper
    ///
    /// Sequence operations run with the wrapper as receiver. Any other name is
    /// dispatched as a direct call with the wrapped value prepended, and the
    /// result is re-wrapped according to its [`ResultShape`].
    ///
    /// # Errors
    /// [`CallError::UnknownOperation`] or whatever the operation raises
    fn call_chain(&self, receiver: &Wrapped, name: &str, args: &[Value])
        -> Result<Value, CallError>;

    /// Rebind the surface to a new context
    ///
    /// # Errors
    /// [`CallError::NoContextFactory`] when the surface cannot be rebound
    fn run_in_context(&self, context: &Value) -> Result<Self, CallError>
    where
        Self: Sized;

    /// Start an implicit chain
    fn wrap(&self, value: Value) -> Chain<'_, Self>
    where
        Self: Sized,
    {
        Chain::new(self, Wrapped::new(value, false))
    }

    /// Start an explicit chain (every result stays wrapped)
    fn chain(&self, value: Value) -> Chain<'_, Self>
    where
        Self: Sized,
    {
        Chain::new(self, Wrapped::new(value, true))
    }

    /// Continue a chain from a wrapped result
    fn resume(&self, wrapped: Wrapped) -> Chain<'_, Self>
    where
        Self: Sized,
    {
        Chain::new(self, wrapped)
    }
}

/// Chain wrapper bound to the surface it calls through
pub struct Chain<'a, D> {
    surface: &'a D,
    wrapped: Wrapped,
}

impl<'a, D: Dispatch> Chain<'a, D> {
    fn new(surface: &'a D, wrapped: Wrapped) -> Self {
        Self { surface, wrapped }
    }

    /// The wrapper
    #[inline]
    #[must_use]
    pub fn wrapped(&self) -> &Wrapped {
        &self.wrapped
    }

    /// Call `name` on the chain
    ///
    /// # Errors
    /// Propagates the operation's error
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, CallError> {
        self.surface.call_chain(&self.wrapped, name, args)
    }

    /// Call `name` and continue chaining when the result is wrapped
    ///
    /// # Errors
    /// Propagates the operation's error, or [`CallError::InvalidArgument`]
    /// when the result left the chain
    pub fn then(&self, name: &str, args: &[Value]) -> Result<Chain<'a, D>, CallError> {
        match self.call(name, args)? {
            Value::Wrapped(w) => Ok(Chain::new(self.surface, w)),
            other => Err(CallError::invalid_argument(
                name,
                format!("expected a wrapped result, got {}", other.type_name()),
            )),
        }
    }

    /// Unwrap through the `value` sequence operation
    ///
    /// # Errors
    /// Propagates the operation's error
    pub fn value(&self) -> Result<Value, CallError> {
        self.call("value", &[])
    }
}

/// Run a direct operation on a chain wrapper
///
/// The wrapped value becomes the first argument. A result that is already
/// wrapped is returned as is.
///
/// # Errors
/// Propagates the direct call's error
pub fn call_direct_chained<D: Dispatch + ?Sized>(
    surface: &D,
    shape: ResultShape,
    receiver: &Wrapped,
    name: &str,
    args: &[Value],
) -> Result<Value, CallError> {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(receiver.value().clone());
    full.extend_from_slice(args);

    let result = surface.call(name, &full)?;
    let extra_args = args.iter().any(|a| !matches!(a, Value::Undefined | Value::Null));

    if !shape.rewraps(receiver.chain_all(), extra_args) {
        return Ok(result);
    }
    Ok(match result {
        wrapped @ Value::Wrapped(_) => wrapped,
        other => Value::Wrapped(Wrapped::new(other, receiver.chain_all())),
    })
}

impl Dispatch for Surface {
    fn label(&self) -> &str {
        &self.label
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, CallError> {
        let entry = self
            .direct
            .get(name)
            .ok_or_else(|| CallError::UnknownOperation(name.to_string()))?;
        (entry.op)(&CallContext::direct(), args)
    }

    fn call_chain(
        &self,
        receiver: &Wrapped,
        name: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        if let Some(op) = self.sequence.get(name) {
            return op(&CallContext::chained(receiver.clone()), args);
        }
        if self.direct.contains_key(name) {
            return call_direct_chained(self, self.shape(name), receiver, name, args);
        }
        Err(CallError::UnknownOperation(name.to_string()))
    }

    fn run_in_context(&self, context: &Value) -> Result<Self, CallError> {
        let factory = self
            .context_factory
            .as_ref()
            .ok_or_else(|| CallError::NoContextFactory(self.label.clone()))?;
        factory(context)
    }
}
