//! Deep clone, structural equality and the comparability predicate
//!
//! All three walks are cycle-safe. Container contents are snapshotted before
//! recursing so no lock is held across the walk.

use crate::value::{ArrayRef, Instance, ObjectRef, Value, Wrapped};
use std::collections::{HashMap, HashSet};

/// Recursive copier that preserves sharing and cycles
///
/// One cloner used across several values keeps aliasing between them: an
/// array reachable from two arguments is copied once and shared by both
/// copies.
#[derive(Default)]
pub struct DeepCloner {
    arrays: HashMap<usize, ArrayRef>,
    objects: HashMap<usize, ObjectRef>,
}

impl DeepCloner {
    /// Create cloner with empty memo
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `value`; functions are shared, not copied
    pub fn clone_value(&mut self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(self.clone_array(items)),
            Value::Object(fields) => Value::Object(self.clone_object(fields)),
            Value::Instance(inst) => Value::Instance(Instance {
                class: inst.class.clone(),
                fields: self.clone_object(&inst.fields),
            }),
            Value::Wrapped(w) => {
                Value::Wrapped(Wrapped::new(self.clone_value(w.value()), w.chain_all()))
            }
            other => other.clone(),
        }
    }

    /// Copy every value with shared memo
    pub fn clone_all(&mut self, values: &[Value]) -> Vec<Value> {
        values.iter().map(|v| self.clone_value(v)).collect()
    }

    fn clone_array(&mut self, items: &ArrayRef) -> ArrayRef {
        if let Some(done) = self.arrays.get(&items.addr()) {
            return done.clone();
        }
        let copy = ArrayRef::default();
        self.arrays.insert(items.addr(), copy.clone());

        let snapshot = items.snapshot();
        let cloned = self.clone_all(&snapshot);
        *copy.write() = cloned;
        copy
    }

    fn clone_object(&mut self, fields: &ObjectRef) -> ObjectRef {
        if let Some(done) = self.objects.get(&fields.addr()) {
            return done.clone();
        }
        let copy = ObjectRef::default();
        self.objects.insert(fields.addr(), copy.clone());

        let snapshot = fields.snapshot();
        let mut cloned = crate::value::Fields::with_capacity(snapshot.len());
        for (key, v) in &snapshot {
            cloned.insert(key.clone(), self.clone_value(v));
        }
        *copy.write() = cloned;
        copy
    }
}

/// Deep-copy a single value
#[must_use]
pub fn deep_clone(value: &Value) -> Value {
    DeepCloner::new().clone_value(value)
}

/// Deep-copy an argument list with shared memo
#[must_use]
pub fn deep_clone_all(values: &[Value]) -> Vec<Value> {
    DeepCloner::new().clone_all(values)
}

/// Structural equality
///
/// - `NaN` equals `NaN`
/// - object keys compare regardless of insertion order
/// - instances compare by class name and fields
/// - functions compare by identity
#[must_use]
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    Equality::default().eq(a, b)
}

#[derive(Default)]
struct Equality {
    stack: Vec<(usize, usize)>,
}

impl Equality {
    fn eq(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            #[allow(clippy::float_cmp)]
            (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
            (Value::Array(x), Value::Array(y)) => self.eq_arrays(x, y),
            (Value::Object(x), Value::Object(y)) => self.eq_objects(x, y),
            (Value::Instance(x), Value::Instance(y)) => {
                x.class == y.class && self.eq_objects(&x.fields, &y.fields)
            }
            (Value::Wrapped(x), Value::Wrapped(y)) => {
                x.chain_all() == y.chain_all() && self.eq(x.value(), y.value())
            }
            _ => false,
        }
    }

    fn eq_arrays(&mut self, x: &ArrayRef, y: &ArrayRef) -> bool {
        if x.ptr_eq(y) {
            return true;
        }
        let key = (x.addr(), y.addr());
        if self.stack.contains(&key) {
            return true;
        }

        let (xs, ys) = (x.snapshot(), y.snapshot());
        if xs.len() != ys.len() {
            return false;
        }

        self.stack.push(key);
        let equal = xs.iter().zip(&ys).all(|(l, r)| self.eq(l, r));
        self.stack.pop();
        equal
    }

    fn eq_objects(&mut self, x: &ObjectRef, y: &ObjectRef) -> bool {
        if x.ptr_eq(y) {
            return true;
        }
        let key = (x.addr(), y.addr());
        if self.stack.contains(&key) {
            return true;
        }

        let (xs, ys) = (x.snapshot(), y.snapshot());
        if xs.len() != ys.len() {
            return false;
        }

        self.stack.push(key);
        let equal = xs
            .iter()
            .all(|(k, l)| ys.get(k).is_some_and(|r| self.eq(l, r)));
        self.stack.pop();
        equal
    }
}

/// Decides whether a result is meaningful to compare
///
/// Implemented for any `Fn(&Value) -> bool` closure.
pub trait Comparability: Send + Sync {
    /// Whether `value` can be compared across implementations
    fn is_comparable(&self, value: &Value) -> bool;
}

impl<F> Comparability for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn is_comparable(&self, value: &Value) -> bool {
        self(value)
    }
}

/// Default predicate
///
/// Rejects `undefined`, `NaN`, and any value that contains a function, a
/// class instance or a chain wrapper at any depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultComparability;

impl Comparability for DefaultComparability {
    fn is_comparable(&self, value: &Value) -> bool {
        match value {
            Value::Undefined => false,
            Value::Number(n) if n.is_nan() => false,
            _ => !has_incidental_identity(value),
        }
    }
}

/// Whether `value` contains a function, instance or wrapper at any depth
#[must_use]
pub fn has_incidental_identity(value: &Value) -> bool {
    let mut visited = HashSet::new();
    contains_identity(value, &mut visited)
}

fn contains_identity(value: &Value, visited: &mut HashSet<usize>) -> bool {
    match value {
        Value::Function(_) | Value::Instance(_) | Value::Wrapped(_) => true,
        Value::Array(items) => {
            if !visited.insert(items.addr()) {
                return false;
            }
            items
                .snapshot()
                .iter()
                .any(|v| contains_identity(v, visited))
        }
        Value::Object(fields) => {
            if !visited.insert(fields.addr()) {
                return false;
            }
            fields
                .snapshot()
                .values()
                .any(|v| contains_identity(v, visited))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Callback;

    fn cyclic_array() -> Value {
        let v = Value::array([1, 2]);
        let inner = v.clone();
        v.as_array().unwrap().write().push(inner);
        v
    }

    #[test]
    fn deep_clone_is_independent() {
        let original = Value::object([("a", Value::array([1, 2]))]);
        let copy = deep_clone(&original);
        assert_eq!(original, copy);

        let a = copy.as_object().unwrap().get("a").unwrap();
        a.as_array().unwrap().write().push(Value::from(3));
        assert_ne!(original, copy);
        assert_eq!(
            original.as_object().unwrap().get("a").unwrap().as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn deep_clone_shares_functions() {
        let cb = Callback::new(|_| Ok(Value::Null));
        let copy = deep_clone(&Value::array([Value::from(cb.clone())]));
        let item = copy.as_array().unwrap().read()[0].clone();
        assert!(item.as_callback().unwrap().ptr_eq(&cb));
    }

    #[test]
    fn deep_clone_preserves_cycles() {
        let v = cyclic_array();
        let copy = deep_clone(&v);

        let arr = copy.as_array().unwrap();
        let last = arr.read()[2].clone();
        assert!(last.as_array().unwrap().ptr_eq(arr));
        assert!(!arr.ptr_eq(v.as_array().unwrap()));
        assert_eq!(v, copy);
    }

    #[test]
    fn clone_all_keeps_aliasing_between_arguments() {
        let shared = Value::array([1]);
        let copies = deep_clone_all(&[shared.clone(), shared]);
        assert!(copies[0].as_array().unwrap().ptr_eq(copies[1].as_array().unwrap()));
    }

    #[test]
    fn equality_rules() {
        assert!(structurally_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!structurally_equal(&Value::Null, &Value::Undefined));
        assert!(!structurally_equal(&Value::from(1), &Value::from("1")));
        assert!(structurally_equal(
            &Value::object([("a", 1), ("b", 2)]),
            &Value::object([("b", 2), ("a", 1)])
        ));
        assert!(!structurally_equal(
            &Value::object([("a", 1)]),
            &Value::object([("a", 1), ("b", 2)])
        ));
        assert!(!structurally_equal(&Value::array([1, 2]), &Value::array([2, 1])));
        assert!(!structurally_equal(
            &Value::instance("Foo", [("a", 1)]),
            &Value::instance("Bar", [("a", 1)])
        ));
        assert!(!structurally_equal(
            &Value::from(Callback::identity()),
            &Value::from(Callback::identity())
        ));
    }

    #[test]
    fn equality_terminates_on_cycles() {
        assert!(structurally_equal(&cyclic_array(), &cyclic_array()));
    }

    #[test]
    fn default_comparability() {
        let check = DefaultComparability;
        assert!(!check.is_comparable(&Value::Undefined));
        assert!(!check.is_comparable(&Value::Number(f64::NAN)));
        assert!(check.is_comparable(&Value::Null));
        assert!(check.is_comparable(&Value::array([1, 2])));
        assert!(check.is_comparable(&cyclic_array()));
        assert!(!check.is_comparable(&Value::instance("Bar", [("a", 1)])));
        assert!(!check.is_comparable(&Value::object([(
            "f",
            Value::from(Callback::identity())
        )])));
        // only the top level rejects undefined
        assert!(check.is_comparable(&Value::array([Value::Undefined])));
    }

    #[test]
    fn closures_are_predicates() {
        let everything = |_: &Value| true;
        assert!(everything.is_comparable(&Value::Undefined));
    }
}
