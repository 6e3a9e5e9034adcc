//! Testing utilities for the shadow workspace
//!
//! Shared fixtures:
//! - [`legacy_surface`] / [`modern_surface`]: toy collection libraries shaped
//!   like two major versions of the same API
//! - [`RecordingSink`]: captures delivered messages
//! - [`CallCounter`]: counts callback invocations

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::missing_panics_doc)]

use parking_lot::Mutex;
use shadow_core::{
    CallError, Callback, ConfigPatch, Reporter, ResultShape, ShadowSurface, Surface, Value,
    Wrapped,
};
use shadow_registry::OperationRegistry;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub const LABEL: &str = "lodash";
pub const LEGACY_VERSION: &str = "3.10.1";
pub const MODERN_VERSION: &str = "4.17.21";

const DEFAULT_TRUNC_LENGTH: usize = 30;
const DEFAULT_OMISSION: &str = "...";

/// Built-in lodash v3 -> v4 registry
pub fn fixture_registry() -> OperationRegistry {
    OperationRegistry::lodash_migration().expect("built-in registry table parses")
}

/// Legacy surface wrapped against the modern one, reporting into `sink`
pub fn shadow_lodash(sink: &RecordingSink) -> ShadowSurface {
    ShadowSurface::install(
        Arc::new(legacy_surface()),
        Arc::new(modern_surface()),
        Arc::new(fixture_registry()),
        sink.reporter(),
    )
}

/// Instance of the custom class `Bar`
pub fn bar(n: i32) -> Value {
    Value::instance("Bar", [("n", n)])
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

enum Clock {
    Counter(Arc<AtomicU64>),
    Context(Callback),
}

impl Clock {
    fn now(&self) -> Result<Value, CallError> {
        match self {
            Self::Counter(ticks) => Ok(Value::Number(ticks.fetch_add(1, Ordering::SeqCst) as f64)),
            Self::Context(now) => now.call(&[]),
        }
    }
}

/// Legacy (v3) toy surface
pub fn legacy_surface() -> Surface {
    legacy_with_clock(Clock::Counter(Arc::new(AtomicU64::new(1_000))))
}

fn legacy_with_clock(clock: Clock) -> Surface {
    let ids = Arc::new(AtomicU64::new(0));
    let builder = Surface::builder(LABEL, LEGACY_VERSION)
        .function("size", ResultShape::Unwrapped, size)
        .function("max", ResultShape::Unwrapped, legacy_max)
        .function("contains", ResultShape::Unwrapped, includes)
        .function("trunc", ResultShape::Unwrapped, legacy_trunc)
        .function("sample", ResultShape::Varies, legacy_sample)
        .function("callback", ResultShape::Unwrapped, make_iteratee)
        .function("now", ResultShape::Unwrapped, move |_| clock.now())
        .function("uniqueId", ResultShape::Unwrapped, move |args| unique_id(&ids, args));

    with_shared_ops(builder)
        .sequence("run", |ctx, _| Ok(ctx.receiver_value()))
        .context_factory(|context| {
            let now = context
                .as_object()
                .and_then(|o| o.get("now"))
                .and_then(|v| v.as_callback().cloned());
            Ok(match now {
                Some(now) => legacy_with_clock(Clock::Context(now)),
                None => legacy_surface(),
            })
        })
        .build()
}

/// Modern (v4) toy surface
pub fn modern_surface() -> Surface {
    let ticks = Arc::new(AtomicU64::new(1_000_000));
    let ids = Arc::new(AtomicU64::new(0));
    let builder = Surface::builder(LABEL, MODERN_VERSION)
        .function("size", ResultShape::Unwrapped, size)
        .function("max", ResultShape::Unwrapped, modern_max)
        .function("includes", ResultShape::Unwrapped, includes)
        .function("truncate", ResultShape::Unwrapped, modern_truncate)
        .function("sample", ResultShape::Unwrapped, |args| {
            Ok(items(&arg(args, 0)).into_iter().next().unwrap_or_default())
        })
        .function("iteratee", ResultShape::Unwrapped, make_iteratee)
        .function("now", ResultShape::Unwrapped, move |_| {
            Ok(Value::Number(ticks.fetch_add(1, Ordering::SeqCst) as f64))
        })
        .function("uniqueId", ResultShape::Unwrapped, move |args| unique_id(&ids, args));

    with_shared_ops(builder).build()
}

fn with_shared_ops(builder: shadow_core::SurfaceBuilder) -> shadow_core::SurfaceBuilder {
    builder
        .function("each", ResultShape::Wrapped, |args| each(args, false))
        .function("forEach", ResultShape::Wrapped, |args| each(args, false))
        .function("eachRight", ResultShape::Wrapped, |args| each(args, true))
        .function("forEachRight", ResultShape::Wrapped, |args| each(args, true))
        .function("forOwn", ResultShape::Wrapped, |args| each(args, false))
        .function("map", ResultShape::Wrapped, map)
        .function("times", ResultShape::Unwrapped, times)
        .function("remove", ResultShape::Wrapped, remove)
        .function("curry", ResultShape::Wrapped, curry)
        .function("chain", ResultShape::Wrapped, |args| {
            Ok(Value::Wrapped(Wrapped::new(arg(args, 0), true)))
        })
        .sequence("value", |ctx, _| Ok(ctx.receiver_value()))
        .sequence("valueOf", |ctx, _| Ok(ctx.receiver_value()))
        .sequence("chain", |ctx, _| {
            Ok(Value::Wrapped(Wrapped::new(ctx.receiver_value(), true)))
        })
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn is_nullish(value: &Value) -> bool {
    matches!(value, Value::Undefined | Value::Null)
}

/// Element values of a collection
fn items(collection: &Value) -> Vec<Value> {
    match collection {
        Value::Array(items) => items.snapshot(),
        Value::Object(fields) => fields.snapshot().into_values().collect(),
        Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        _ => Vec::new(),
    }
}

/// (key, value) pairs of a collection
fn entries(collection: &Value) -> Vec<(Value, Value)> {
    match collection {
        Value::Array(items) => items
            .snapshot()
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Value::from(i), v))
            .collect(),
        Value::Object(fields) => fields
            .snapshot()
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn property(value: Option<&Value>, key: &str) -> Value {
    match value {
        Some(Value::Object(fields)) => fields.get(key).unwrap_or_default(),
        Some(Value::Instance(inst)) => inst.fields().get(key).unwrap_or_default(),
        _ => Value::Undefined,
    }
}

/// Callback for an iteratee argument: functions as is, strings as property
/// accessors, anything else as identity
fn iteratee(value: &Value) -> Callback {
    match value {
        Value::Function(f) => f.clone(),
        Value::String(key) => {
            let key = key.clone();
            Callback::new(move |args| Ok(property(args.first(), &key)))
        }
        _ => Callback::identity(),
    }
}

fn make_iteratee(args: &[Value]) -> Result<Value, CallError> {
    Ok(Value::Function(iteratee(&arg(args, 0))))
}

fn size(args: &[Value]) -> Result<Value, CallError> {
    Ok(match args.first() {
        Some(Value::Array(items)) => Value::from(items.len()),
        Some(Value::Object(fields)) => Value::from(fields.len()),
        Some(Value::String(s)) => Value::from(s.chars().count()),
        _ => Value::from(0),
    })
}

fn includes(args: &[Value]) -> Result<Value, CallError> {
    let target = arg(args, 1);
    Ok(Value::Bool(match (args.first(), &target) {
        (Some(Value::String(s)), Value::String(t)) => s.contains(t.as_str()),
        (Some(collection), _) => items(collection).contains(&target),
        (None, _) => false,
    }))
}

fn legacy_max(args: &[Value]) -> Result<Value, CallError> {
    let score = iteratee(&arg(args, 1));
    let mut best: Option<(f64, Value)> = None;
    for item in items(&arg(args, 0)) {
        let Some(s) = score.call(std::slice::from_ref(&item))?.as_f64() else {
            continue;
        };
        if best.as_ref().map_or(true, |(b, _)| s > *b) {
            best = Some((s, item));
        }
    }
    Ok(best.map_or(Value::Number(f64::NEG_INFINITY), |(_, item)| item))
}

fn modern_max(args: &[Value]) -> Result<Value, CallError> {
    let max = items(&arg(args, 0))
        .iter()
        .filter_map(Value::as_f64)
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n))));
    Ok(max.map_or(Value::Undefined, Value::Number))
}

fn each(args: &[Value], reverse: bool) -> Result<Value, CallError> {
    let collection = arg(args, 0);
    let f = iteratee(&arg(args, 1));
    let mut pairs = entries(&collection);
    if reverse {
        pairs.reverse();
    }
    for (key, value) in pairs {
        if let Value::Bool(false) = f.call(&[value, key, collection.clone()])? {
            break;
        }
    }
    Ok(collection)
}

fn map(args: &[Value]) -> Result<Value, CallError> {
    let collection = arg(args, 0);
    let f = iteratee(&arg(args, 1));
    let mapped = entries(&collection)
        .into_iter()
        .map(|(key, value)| f.call(&[value, key, collection.clone()]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::from(mapped))
}

fn times(args: &[Value]) -> Result<Value, CallError> {
    let n = arg(args, 0).as_f64().unwrap_or(0.0).max(0.0).floor() as usize;
    let f = iteratee(&arg(args, 1));
    let results = (0..n)
        .map(|i| f.call(&[Value::from(i)]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::from(results))
}

fn remove(args: &[Value]) -> Result<Value, CallError> {
    let Some(array) = args.first().and_then(Value::as_array).cloned() else {
        return Ok(Value::from(Vec::<Value>::new()));
    };
    let predicate = iteratee(&arg(args, 1));

    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for (i, item) in array.snapshot().into_iter().enumerate() {
        let hit = predicate.call(&[item.clone(), Value::from(i), Value::Array(array.clone())])?;
        if hit.is_truthy() {
            removed.push(item);
        } else {
            kept.push(item);
        }
    }
    *array.write() = kept;
    Ok(Value::from(removed))
}

fn curry(args: &[Value]) -> Result<Value, CallError> {
    let Some(f) = args.first().and_then(Value::as_callback).cloned() else {
        return Err(CallError::invalid_argument("curry", "expected a function"));
    };
    Ok(Value::Function(Callback::new(move |args| f.call(args)).named("curried")))
}

fn truncate_text(text: &str, length: usize, omission: &str) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let keep = length.saturating_sub(omission.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(omission);
    out
}

fn options_object(options: &Value) -> (usize, String) {
    let fields = options.as_object();
    let length = fields
        .and_then(|o| o.get("length"))
        .and_then(|v| v.as_f64())
        .map_or(DEFAULT_TRUNC_LENGTH, |n| n.max(0.0) as usize);
    let omission = fields
        .and_then(|o| o.get("omission"))
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_OMISSION.to_string());
    (length, omission)
}

/// v3: options may be a plain length
fn legacy_trunc(args: &[Value]) -> Result<Value, CallError> {
    let text = arg(args, 0);
    let text = text.as_str().unwrap_or_default();
    let (length, omission) = match arg(args, 1) {
        Value::Number(n) => (n.max(0.0) as usize, DEFAULT_OMISSION.to_string()),
        options => options_object(&options),
    };
    Ok(Value::from(truncate_text(text, length, &omission)))
}

/// v4: only an options object is honored
fn modern_truncate(args: &[Value]) -> Result<Value, CallError> {
    let text = arg(args, 0);
    let text = text.as_str().unwrap_or_default();
    let (length, omission) = options_object(&arg(args, 1));
    Ok(Value::from(truncate_text(text, length, &omission)))
}

/// v3: a sample of `n` elements when `n` is given, otherwise one element
fn legacy_sample(args: &[Value]) -> Result<Value, CallError> {
    let all = items(&arg(args, 0));
    let n = arg(args, 1);
    if is_nullish(&n) {
        return Ok(all.into_iter().next().unwrap_or_default());
    }
    let count = n.as_f64().unwrap_or(0.0).max(0.0) as usize;
    Ok(Value::from(all.into_iter().take(count).collect::<Vec<_>>()))
}

fn unique_id(ids: &AtomicU64, args: &[Value]) -> Result<Value, CallError> {
    let id = ids.fetch_add(1, Ordering::SeqCst) + 1;
    let prefix = arg(args, 0);
    Ok(Value::from(format!("{}{id}", prefix.as_str().unwrap_or_default())))
}

// ---------------------------------------------------------------------------
// Sinks and counters
// ---------------------------------------------------------------------------

/// Collects every delivered message
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch routing the log into this sink
    pub fn patch(&self) -> ConfigPatch {
        let lines = Arc::clone(&self.lines);
        ConfigPatch::new().with_log(move |message| lines.lock().push(message.to_string()))
    }

    /// Fresh reporter logging into this sink
    pub fn reporter(&self) -> Arc<Reporter> {
        let reporter = Arc::new(Reporter::new());
        reporter.configure(self.patch());
        reporter
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    /// Renames as `old -> new`, parsed from the default template
    pub fn renames(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter(|l| l.starts_with("shadow: Method renamed"))
            .filter_map(|l| {
                let mut names = l.lines().skip(1).filter_map(|line| line.split("=> ").nth(1));
                Some(format!("{} -> {}", names.next()?, names.next()?))
            })
            .collect()
    }

    /// Names of diverging operations, parsed from the default template
    pub fn divergences(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter(|l| !l.starts_with("shadow: Method renamed"))
            .filter_map(|l| l.strip_prefix("shadow: "))
            .filter_map(|l| l.split('(').next())
            .map(str::to_string)
            .collect()
    }
}

/// Counts callback invocations
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    count: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side-effect-only callback that records each call
    pub fn effect(&self) -> Callback {
        let count = Arc::clone(&self.count);
        Callback::effect(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Callback that records each call and returns `value`
    pub fn returning(&self, value: Value) -> Callback {
        let count = Arc::clone(&self.count);
        Callback::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::Dispatch;

    #[test]
    fn fixtures_install() {
        let sink = RecordingSink::new();
        let shadow = shadow_lodash(&sink);
        assert_eq!(shadow.version(), LEGACY_VERSION);
        assert_eq!(shadow.candidate().version(), MODERN_VERSION);
    }

    #[test]
    fn legacy_and_modern_max_disagree_on_keys() {
        let objects = Value::array([
            Value::object([("a", 1)]),
            Value::object([("a", 2)]),
        ]);
        let args = [objects, Value::from("a")];
        assert_eq!(legacy_max(&args).unwrap(), Value::object([("a", 2)]));
        assert!(modern_max(&args).unwrap().is_undefined());
        assert_eq!(legacy_max(&[Value::array(Vec::<Value>::new())]).unwrap(), Value::Number(f64::NEG_INFINITY));
    }

    #[test]
    fn trunc_versions_disagree_on_numeric_options() {
        let text = Value::from("hi-diddly-ho there, neighborino");
        assert_eq!(
            legacy_trunc(&[text.clone(), Value::from(24)]).unwrap(),
            Value::from("hi-diddly-ho there, n...")
        );
        assert_eq!(
            modern_truncate(&[text, Value::from(24)]).unwrap(),
            Value::from("hi-diddly-ho there, neighbo...")
        );
    }

    #[test]
    fn sink_parses_default_templates() {
        let sink = RecordingSink::new();
        let reporter = sink.reporter();
        reporter.log("shadow: Method renamed\n  v3.10.1 => contains\n  v4.17.21 => includes");
        reporter.log("shadow: max([ 1 ])\n  v3.10.1 => 1\n  v4.17.21 => undefined");
        assert_eq!(sink.renames(), vec!["contains -> includes".to_string()]);
        assert_eq!(sink.divergences(), vec!["max".to_string()]);
    }

    #[test]
    fn counter_counts() {
        let counter = CallCounter::new();
        counter.effect().call(&[]).unwrap();
        counter.returning(Value::Null).call(&[]).unwrap();
        assert_eq!(counter.count(), 2);
        counter.reset();
        assert_eq!(counter.count(), 0);
    }
}
