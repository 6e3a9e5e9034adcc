use pretty_assertions::assert_eq;
use shadow_core::prelude::*;
use shadow_test_utils::{
    fixture_registry, legacy_surface, modern_surface, shadow_lodash, RecordingSink,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_chained_sample_shape_depends_on_arguments() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);
    let wrapped = lodash.wrap(Value::array([1]));

    assert_eq!(wrapped.call("sample", &[]).unwrap(), Value::from(1));

    let sampled = wrapped.then("sample", &[Value::from(1)]).unwrap();
    assert_eq!(sampled.value().unwrap(), Value::array([1]));
    assert!(sink.is_empty());
}

#[test]
fn test_explicit_chain_keeps_results_wrapped() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let size = lodash.chain(Value::array([1, 2, 3])).call("size", &[]).unwrap();
    let wrapped = size.as_wrapped().unwrap();
    assert!(wrapped.chain_all());
    assert_eq!(wrapped.value(), &Value::from(3));
}

#[test]
fn test_chained_direct_calls_are_intercepted() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);
    let objects = Value::array([Value::object([("a", 1)]), Value::object([("a", 2)])]);

    let max = lodash.wrap(objects).call("max", &[Value::from("a")]).unwrap();

    assert_eq!(max, Value::object([("a", 2)]));
    assert_eq!(sink.divergences(), vec!["max".to_string()]);
}

#[test]
fn test_direct_only_sequence_names_stay_reachable_on_chains() {
    let reverse = |args: &[Value]| -> Result<Value, CallError> {
        let mut items = args
            .first()
            .and_then(Value::as_array)
            .map(|a| a.snapshot())
            .unwrap_or_default();
        items.reverse();
        Ok(Value::from(items))
    };
    let reference = Surface::builder("lodash", "3.10.1")
        .function("reverse", ResultShape::Wrapped, reverse)
        .sequence("value", |ctx, _| Ok(ctx.receiver_value()))
        .build();
    let candidate = Surface::builder("lodash", "4.17.21")
        .function("reverse", ResultShape::Wrapped, reverse)
        .sequence("value", |ctx, _| Ok(ctx.receiver_value()))
        .build();
    let sink = RecordingSink::new();
    let shadow = ShadowSurface::install(
        Arc::new(reference.clone()),
        Arc::new(candidate),
        Arc::new(fixture_registry()),
        sink.reporter(),
    );
    assert!(shadow.registry().is_sequence("reverse"));

    let raw = reference.wrap(Value::array([1, 2])).call("reverse", &[]).unwrap();
    let wrapped = shadow.wrap(Value::array([1, 2])).call("reverse", &[]).unwrap();

    assert_eq!(wrapped, raw);
    assert_eq!(wrapped.as_wrapped().map(Wrapped::value), Some(&Value::array([2, 1])));
    assert!(sink.is_empty());
}

#[test]
fn test_run_is_compared_against_renamed_value() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let result = lodash.wrap(Value::array([1, 2])).call("run", &[]).unwrap();

    assert_eq!(result, Value::array([1, 2]));
    assert_eq!(sink.renames(), vec!["run -> value".to_string()]);
    assert!(sink.divergences().is_empty());
    assert!(lodash.bindings().get("run").is_some());
}

#[test]
fn test_candidate_sequence_cannot_touch_receiver() {
    let reference = Surface::builder("lib", "1")
        .sequence("value", |ctx, _| Ok(ctx.receiver_value()))
        .build();
    let candidate = Surface::builder("lib", "2")
        .sequence("value", |ctx, _| {
            let value = ctx.receiver_value();
            if let Some(items) = value.as_array() {
                items.write().clear();
            }
            Ok(value)
        })
        .build();
    let sink = RecordingSink::new();
    let shadow = ShadowSurface::install(
        Arc::new(reference),
        Arc::new(candidate),
        Arc::new(OperationRegistry::new().with_sequence("value")),
        sink.reporter(),
    );

    let data = Value::array([1, 2]);
    let result = shadow.wrap(data.clone()).value().unwrap();

    assert_eq!(result, Value::array([1, 2]));
    assert_eq!(data, Value::array([1, 2]));
    assert_eq!(sink.divergences(), vec!["value".to_string()]);
}

#[test]
fn test_run_in_context_uses_context_clock() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let now = Callback::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::from(1_700_000_000))
    });

    let rebound = lodash
        .run_in_context(&Value::object([("now", Value::from(now))]))
        .unwrap();
    let stamp = rebound.call("now", &[]).unwrap();

    assert_eq!(stamp, Value::from(1_700_000_000));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sink.is_empty());
}

#[test]
fn test_run_in_context_keeps_interception() {
    let sink = RecordingSink::new();
    let lodash = shadow_lodash(&sink);

    let rebound = lodash.run_in_context(&Value::Undefined).unwrap();
    assert!(rebound.bindings().is_empty());

    let objects = Value::array([Value::object([("a", 1)]), Value::object([("a", 3)])]);
    rebound.call("max", &[objects, Value::from("a")]).unwrap();

    assert_eq!(sink.divergences(), vec!["max".to_string()]);
    assert!(Arc::ptr_eq(rebound.candidate(), lodash.candidate()));
}

#[test]
fn test_interceptor_installs_each_pair_once() {
    let sink = RecordingSink::new();
    let interceptor = Interceptor::new(fixture_registry()).with_reporter(sink.reporter());
    let legacy = Arc::new(legacy_surface());
    let modern = Arc::new(modern_surface());

    let first = interceptor.install(&legacy, &modern);
    first.call("size", &[Value::array([1])]).unwrap();
    let second = interceptor.install(&legacy, &modern);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.bindings().len(), 1);
    assert_eq!(interceptor.len(), 1);
}

#[test]
fn test_unlisted_sequence_operation_is_served_and_compared() {
    let reference = Surface::builder("lib", "1")
        .sequence("tap", |ctx, _| Ok(ctx.receiver_value()))
        .build();
    let candidate = Surface::builder("lib", "2")
        .sequence("tap", |_, _| Ok(Value::Null))
        .build();
    let sink = RecordingSink::new();
    let shadow = ShadowSurface::install(
        Arc::new(reference.clone()),
        Arc::new(candidate),
        Arc::new(OperationRegistry::new()),
        sink.reporter(),
    );

    let raw = reference.wrap(Value::from(7)).call("tap", &[]).unwrap();
    let wrapped = shadow.wrap(Value::from(7)).call("tap", &[]).unwrap();

    assert_eq!(wrapped, raw);
    assert_eq!(sink.divergences(), vec!["tap".to_string()]);
}

#[test]
fn test_unknown_names_fail_to_bind() {
    let shadow = shadow_core::install(legacy_surface(), modern_surface(), fixture_registry());

    let err = shadow.binding("nope").unwrap_err();

    assert!(matches!(err, shadow_core::ResolutionError::MissingReference { ref name, .. } if name == "nope"));
    assert!(shadow.call("nope", &[]).is_err());
}

#[test]
fn test_missing_candidate_operation_never_reports() {
    let reference = Surface::builder("lib", "1")
        .function("legacyOnly", ResultShape::Unwrapped, |_| Ok(Value::from(1)))
        .build();
    let candidate = Surface::builder("lib", "2").build();
    let sink = RecordingSink::new();
    let shadow = ShadowSurface::install(
        Arc::new(reference),
        Arc::new(candidate),
        Arc::new(OperationRegistry::new()),
        sink.reporter(),
    );

    assert_eq!(shadow.call("legacyOnly", &[]).unwrap(), Value::from(1));
    assert!(!shadow.binding("legacyOnly").unwrap().has_candidate());
    assert!(sink.is_empty());
}
