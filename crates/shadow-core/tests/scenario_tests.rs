use pretty_assertions::assert_eq;
use shadow_core::prelude::*;
use shadow_test_utils::{bar, shadow_lodash, CallCounter, RecordingSink};
use std::sync::Arc;

fn objects() -> Value {
    Value::array([
        Value::object([("a", 1)]),
        Value::object([("a", 2)]),
        Value::object([("a", 3)]),
    ])
}

#[test]
fn test_size_matches_without_reports() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let size = lodash.call("size", &[Value::array([1, 2, 3])]).unwrap();

    assert_eq!(size, Value::from(3));
    assert!(sink.is_empty());
}

#[test]
fn test_max_by_key_reports_one_divergence() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let max = lodash.call("max", &[objects(), Value::from("a")]).unwrap();

    assert_eq!(max, Value::object([("a", 3)]));
    assert_eq!(
        sink.lines(),
        vec![
            "shadow: max([ { a: 1 }, { a: 2 }, { a: 3 } ], 'a')\n  v3.10.1 => { a: 3 }\n  v4.17.21 => undefined"
                .to_string()
        ]
    );
}

#[test]
fn test_renamed_operation_reports_rename_only() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let found = lodash
        .call("contains", &[Value::array([1, 2, 3]), Value::from(2)])
        .unwrap();

    assert_eq!(found, Value::Bool(true));
    assert_eq!(sink.renames(), vec!["contains -> includes".to_string()]);
    assert!(sink.divergences().is_empty());
}

#[test]
fn test_each_invokes_iteratee_once_per_element() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);
    let counter = CallCounter::new();

    lodash
        .call("each", &[Value::array([1, 2, 3]), Value::from(counter.effect())])
        .unwrap();
    assert_eq!(counter.count(), 3);

    // a value-returning callback is still replaced for a non-mappable operation
    counter.reset();
    lodash
        .call("forEach", &[Value::array([1, 2, 3]), Value::from(counter.returning(Value::Bool(true)))])
        .unwrap();
    assert_eq!(counter.count(), 3);
    assert!(sink.is_empty());
}

#[test]
fn test_times_passes_returning_iteratee_to_candidate() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);
    let counter = CallCounter::new();

    lodash
        .call("times", &[Value::from(1), Value::from(counter.effect())])
        .unwrap();
    assert_eq!(counter.count(), 1);

    counter.reset();
    lodash
        .call("times", &[Value::from(1), Value::from(counter.returning(Value::Undefined))])
        .unwrap();
    assert_eq!(counter.count(), 2);
}

#[test]
fn test_remove_mutates_caller_array_once() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);
    let array = Value::array([1, 2, 3]);

    let first = Value::from(Callback::new(|args| {
        Ok(Value::Bool(args.get(1).and_then(Value::as_f64) == Some(0.0)))
    }));
    let removed = lodash.call("remove", &[array.clone(), first]).unwrap();

    assert_eq!(removed, Value::array([1]));
    assert_eq!(array, Value::array([2, 3]));
    assert!(sink.is_empty());
}

#[test]
fn test_remove_keeps_caller_array_with_stateful_predicate() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);
    let array = Value::array([1, 2, 3]);

    let last_index = Arc::new(parking_lot::Mutex::new(0.0_f64));
    let state = Arc::clone(&last_index);
    let predicate = Value::from(Callback::new(move |args| {
        let index = args.get(1).and_then(Value::as_f64).unwrap_or_default();
        let mut last = state.lock();
        if *last > index {
            return Ok(Value::Bool(true));
        }
        *last = index;
        Ok(Value::Undefined)
    }));

    lodash.call("remove", &[array.clone(), predicate]).unwrap();

    // the candidate sees a stale predicate state and removes from its own copy
    assert_eq!(array, Value::array([1, 2, 3]));
    assert_eq!(sink.divergences(), vec!["remove".to_string()]);
}

#[test]
fn test_truncation_reports_rename_and_divergence() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let result = lodash
        .call(
            "trunc",
            &[Value::from("hi-diddly-ho there, neighborino"), Value::from(24)],
        )
        .unwrap();

    assert_eq!(result, Value::from("hi-diddly-ho there, n..."));
    assert_eq!(sink.renames(), vec!["trunc -> truncate".to_string()]);
    assert_eq!(sink.divergences(), vec!["trunc".to_string()]);
}

#[test]
fn test_uncomparable_results_never_report() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let counter = Arc::new(std::sync::atomic::AtomicI32::new(0));
    let make_bar = Value::from(Callback::new(move |_| {
        Ok(bar(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)))
    }));
    let bars = lodash.call("times", &[Value::from(2), make_bar]).unwrap();
    assert_eq!(bars, Value::array([bar(0), bar(1)]));

    let f = Value::from(Callback::new(|args| Ok(Value::from(args.to_vec()))));
    let curried = lodash.call("curry", &[f]).unwrap();
    assert!(curried.as_callback().is_some());

    assert!(sink.is_empty());
}

#[test]
fn test_ignored_results_skip_candidate() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let id = lodash.call("uniqueId", &[Value::from("x")]).unwrap();
    assert_eq!(id, Value::from("x1"));
    lodash.call("now", &[]).unwrap();
    lodash.call("sample", &[Value::array([1, 2])]).unwrap();

    // the candidate counters never advanced
    assert_eq!(lodash.candidate().call("uniqueId", &[]).unwrap(), Value::from("1"));
    assert!(sink.is_empty());
}

#[test]
fn test_ignored_rename_is_silent() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let f = lodash.call("callback", &[Value::from("a")]).unwrap();
    assert!(f.as_callback().is_some());
    assert!(sink.is_empty());
}

#[test]
fn test_reference_errors_reach_caller() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let err = lodash.call("curry", &[Value::from(1)]).unwrap_err();
    assert!(matches!(err, CallError::InvalidArgument { ref operation, .. } if operation == "curry"));
    assert!(lodash.call("missing", &[]).is_err());
    assert!(sink.is_empty());
}

#[test]
fn test_reentrant_calls_report_nested_divergence() {
    let sink = RecordingSink::new();
    let lodash = Arc::new(shadow_lodash(&sink));

    let inner = Arc::clone(&lodash);
    let nested = Value::from(Callback::new(move |_| inner.call("max", &[objects(), Value::from("a")])));
    let mapped = lodash.call("map", &[Value::array([1]), nested]).unwrap();

    assert_eq!(mapped, Value::array([Value::object([("a", 3)])]));
    assert!(sink.divergences().contains(&"max".to_string()));
}

#[test]
fn test_repeated_divergence_is_logged_once() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    for _ in 0..3 {
        lodash.call("max", &[objects(), Value::from("a")]).unwrap();
    }
    assert_eq!(sink.len(), 1);

    lodash.reporter().reset();
    lodash.call("max", &[objects(), Value::from("a")]).unwrap();
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_bindings_are_memoized_per_name() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    lodash.call("size", &[Value::array([1])]).unwrap();
    let first = lodash.bindings().get("size").unwrap();
    lodash.call("size", &[Value::array([1, 2])]).unwrap();
    let second = lodash.bindings().get("size").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(lodash.bindings().len(), 1);
}
