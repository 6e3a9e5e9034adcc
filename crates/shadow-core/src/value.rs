//! Dynamic values exchanged with implementation surfaces
//!
//! Arrays and objects are shared handles: an operation that mutates an array
//! argument mutates the caller's array, exactly as the wrapped API would.
//! Independent copies are made with [`crate::compare::deep_clone`].

use crate::compare;
use crate::error::CallError;
use crate::render;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

/// Ordered object fields
pub type Fields = IndexMap<String, Value>;

/// A dynamically typed value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number (double precision, may be NaN)
    Number(f64),
    /// String
    String(String),
    /// Shared, mutable array
    Array(ArrayRef),
    /// Shared, mutable plain object
    Object(ObjectRef),
    /// Callable value
    Function(Callback),
    /// Instance of a custom class
    Instance(Instance),
    /// Chain wrapper around a value
    Wrapped(Wrapped),
}

impl Value {
    /// Create an array value
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Array(ArrayRef::new(items.into_iter().map(Into::into).collect()))
    }

    /// Create a plain object value
    pub fn object<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Object(ObjectRef::new(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Create an instance of class `class`
    pub fn instance<I, K, V>(class: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Instance(Instance {
            class: Arc::from(class),
            fields: ObjectRef::new(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        })
    }

    /// Short type name used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Instance(_) => "instance",
            Self::Wrapped(_) => "wrapped",
        }
    }

    /// Check for `Undefined`
    #[inline]
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check for NaN
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_nan())
    }

    /// Truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(i) => Some(i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_wrapped(&self) -> Option<&Wrapped> {
        match self {
            Self::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    /// Unwrap a chain wrapper, or return the value unchanged
    #[must_use]
    pub fn into_unwrapped(self) -> Self {
        match self {
            Self::Wrapped(w) => w.into_value(),
            other => other,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality (see [`compare::structurally_equal`])
    fn eq(&self, other: &Self) -> bool {
        compare::structurally_equal(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::inspect(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::inspect(self))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<usize> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(ArrayRef::new(value))
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Self::Function(value)
    }
}

impl From<Wrapped> for Value {
    fn from(value: Wrapped) -> Self {
        Self::Wrapped(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::array(items),
            serde_json::Value::Object(fields) => Self::object(fields),
        }
    }
}

/// Shared handle to a mutable array
#[derive(Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    /// Wrap items in a new handle
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Lock for reading
    ///
    /// Do not hold the guard while calling back into user code.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.0.read()
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.0.write()
    }

    /// Shallow copy of the current items
    #[must_use]
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles point at the same array
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

/// Shared handle to a mutable plain object
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<Fields>>);

impl ObjectRef {
    /// Wrap fields in a new handle
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self(Arc::new(RwLock::new(fields)))
    }

    /// Lock for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Fields> {
        self.0.read()
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, Fields> {
        self.0.write()
    }

    /// Shallow copy of the current fields
    #[must_use]
    pub fn snapshot(&self) -> Fields {
        self.0.read().clone()
    }

    /// Get a field by key (shallow copy)
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles point at the same object
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

/// Instance of a custom class
///
/// Instances are constructed with implementation-specific identity, so they
/// are never considered comparable by the default predicate.
#[derive(Clone)]
pub struct Instance {
    pub(crate) class: Arc<str>,
    pub(crate) fields: ObjectRef,
}

impl Instance {
    /// Class name
    #[inline]
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Instance fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &ObjectRef {
        &self.fields
    }
}

/// Chain wrapper: the value a sequence operation is called on
#[derive(Clone)]
pub struct Wrapped {
    value: Box<Value>,
    chain_all: bool,
}

impl Wrapped {
    /// Wrap `value`; `chain_all` marks an explicit chain whose results stay wrapped
    #[must_use]
    pub fn new(value: Value, chain_all: bool) -> Self {
        Self {
            value: Box::new(value),
            chain_all,
        }
    }

    /// Wrapped value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether this is an explicit chain
    #[inline]
    #[must_use]
    pub fn chain_all(&self) -> bool {
        self.chain_all
    }

    /// Take the wrapped value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        *self.value
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("value", &self.value)
            .field("chain_all", &self.chain_all)
            .finish()
    }
}

type CallbackFn = dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync;

/// Whether a callback's return value carries meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    /// The return value is significant (e.g. mapped, or an early-exit signal)
    Value,
    /// Side effects only; the callback always yields `undefined`
    Nothing,
}

/// Callable value passed as an argument (iteratee, predicate, ...)
///
/// Cloning shares the underlying closure.
#[derive(Clone)]
pub struct Callback {
    name: Option<Arc<str>>,
    returns: Returns,
    f: Arc<CallbackFn>,
}

impl Callback {
    /// Callback whose return value is significant
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            returns: Returns::Value,
            f: Arc::new(f),
        }
    }

    /// Side-effect-only callback; it can never signal early termination
    pub fn effect<F>(f: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self {
            name: None,
            returns: Returns::Nothing,
            f: Arc::new(move |args| {
                f(args);
                Ok(Value::Undefined)
            }),
        }
    }

    /// Passthrough returning its first argument
    #[must_use]
    pub fn identity() -> Self {
        Self::new(|args| Ok(args.first().cloned().unwrap_or_default())).named("identity")
    }

    /// Attach a display name
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn returns(&self) -> Returns {
        self.returns
    }

    /// Whether the return value is significant
    #[inline]
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.returns == Returns::Value
    }

    /// Invoke the callback
    ///
    /// # Errors
    /// Propagates whatever the callback raises
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        (self.f)(args)
    }

    /// Whether both values share the same closure
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.f).cast::<()>() == Arc::as_ptr(&other.f).cast::<()>()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn array_handles_share_mutation() {
        let a = Value::array([1, 2, 3]);
        let b = a.clone();
        b.as_array().unwrap().write().push(Value::from(4));
        assert_eq!(a.as_array().unwrap().len(), 4);
        assert!(a.as_array().unwrap().ptr_eq(b.as_array().unwrap()));
    }

    #[test]
    fn from_json_builds_containers() {
        let v = Value::from(json!({"a": [1, "x", null], "b": true}));
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.get("b"), Some(Value::Bool(true)));
        assert_eq!(obj.get("a").unwrap(), Value::array([Value::from(1), Value::from("x"), Value::Null]));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::array(Vec::<Value>::new()).is_truthy());
    }

    #[test]
    fn effect_callback_yields_undefined() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let cb = Callback::effect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(cb.returns(), Returns::Nothing);
        assert!(cb.call(&[Value::from(1)]).unwrap().is_undefined());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identity_returns_first_argument() {
        let id = Callback::identity();
        assert!(id.returns_value());
        assert_eq!(id.name(), Some("identity"));
        assert_eq!(id.call(&[Value::from(7), Value::from(1)]).unwrap(), Value::from(7));
        assert!(id.call(&[]).unwrap().is_undefined());
    }

    #[test]
    fn callback_clone_shares_closure() {
        let cb = Callback::new(|_| Ok(Value::Null));
        let other = Callback::new(|_| Ok(Value::Null));
        assert!(cb.ptr_eq(&cb.clone()));
        assert!(!cb.ptr_eq(&other));
    }

    #[test]
    fn wrapped_roundtrip() {
        let w = Wrapped::new(Value::from(1), true);
        assert!(w.chain_all());
        assert_eq!(Value::from(w).into_unwrapped(), Value::from(1));
    }

    #[test]
    fn instance_exposes_class_and_fields() {
        let v = Value::instance("Bar", [("a", 1)]);
        let inst = v.as_instance().unwrap();
        assert_eq!(inst.class(), "Bar");
        assert_eq!(inst.fields().get("a"), Some(Value::from(1)));
        assert_eq!(v.type_name(), "instance");
    }
}
