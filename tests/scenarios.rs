//! End-to-end scenarios exercised through the public `Evaluator`/module-level
//! API, covering the documented concrete examples plus the strict/non-strict
//! and create-match/overwrite write-option contracts.

use dictwalk::{exists, get, run_filter_function, set, unset, Error, Evaluator, Value, WriteOptions};
use pretty_assertions::assert_eq;

fn json(s: &str) -> Value {
    serde_json::from_str(s).unwrap()
}

#[test]
fn scenario_one_simple_key_chain() {
    let data = json(r#"{"a":{"b":{"c":1}}}"#);
    assert_eq!(get(&data, "a.b.c", Value::Null, false).unwrap(), Value::Integer(1));
}

#[test]
fn scenario_two_filter_map_reduce_pipeline() {
    let data = json(r#"{"a":{"b":[{"id":1,"c":1},{"id":2,"c":2},{"id":3,"c":3},{"id":4,"c":4},{"id":5,"c":5},{"id":6,"c":6}]}}"#);
    let path = "a.b[?id==$even].c[]|$add(2)[]|$double[]|$pow(2)[]|$sum";
    assert_eq!(get(&data, path, Value::Null, true).unwrap(), Value::Integer(464));
}

#[test]
fn scenario_three_stringwise_equality_fallback() {
    let data = json(r#"{"a":{"b":[{"id":"1","c":10},{"id":"2","c":20}]}}"#);
    assert_eq!(get(&data, "a.b[?id==1].c[]", Value::Null, false).unwrap(), Value::List(vec![Value::Integer(10)]));
}

#[test]
fn scenario_four_predicate_create_match_write() {
    let mut data = json("{}");
    set(&mut data, "a.b[?id==3].c", Value::Integer(5), false, WriteOptions::default()).unwrap();
    assert_eq!(data, json(r#"{"a":{"b":[{"id":"3","c":5}]}}"#));
}

#[test]
fn scenario_five_root_reference_write_is_a_snapshot() {
    let mut data = json(r#"{"a":{"b":[{"v":1},{"v":2},{"v":3}]},"d":9}"#);
    set(&mut data, "a.b[].v", Value::String("$$root.d|$double".into()), false, WriteOptions::default()).unwrap();
    let got = get(&data, "a.b[].v", Value::Null, true).unwrap();
    assert_eq!(got, Value::List(vec![Value::Integer(18); 3]));
}

#[test]
fn scenario_six_predicate_unset() {
    let mut data = json(r#"{"a":{"b":[{"id":1},{"id":2},{"id":3}]}}"#);
    unset(&mut data, "a.b[?id>1]", false).unwrap();
    assert_eq!(data, json(r#"{"a":{"b":[{"id":1}]}}"#));
}

#[test]
fn exists_matches_get_reachability_not_truthiness() {
    let data = json(r#"{"a":{"b":[{"id":1},{"id":2}]}}"#);
    assert!(exists(&data, "a.b[?id==99]", false).unwrap());
    let v = get(&data, "a.b[?id==99]", Value::String("sentinel".into()), false).unwrap();
    assert_eq!(v, Value::List(vec![]));
}

#[test]
fn strict_get_on_missing_path_raises_resolution_error() {
    let data = json(r#"{"a":1}"#);
    let err = get(&data, "a.b", Value::Null, true).unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
}

#[test]
fn non_strict_get_on_missing_path_returns_default() {
    let data = json(r#"{"a":1}"#);
    assert_eq!(get(&data, "a.b", Value::Integer(-1), false).unwrap(), Value::Integer(-1));
}

#[test]
fn unset_is_idempotent() {
    let mut once = json(r#"{"a":{"b":1,"c":2}}"#);
    unset(&mut once, "a.b", false).unwrap();
    let mut twice = once.clone();
    unset(&mut twice, "a.b", false).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn output_transform_on_read_matches_separate_run_filter_function_call() {
    let data = json(r#"{"a":4}"#);
    let via_transform = get(&data, "a|$double", Value::Null, true).unwrap();
    let a = get(&data, "a", Value::Null, true).unwrap();
    let via_run_filter = run_filter_function("$double", &a).unwrap();
    assert_eq!(via_transform, via_run_filter);
}

#[test]
fn overwrite_incompatible_false_leaves_scalar_in_place() {
    let mut data = json(r#"{"a":{"b":1}}"#);
    let options = WriteOptions {
        overwrite_incompatible: false,
        ..Default::default()
    };
    set(&mut data, "a.b.c", Value::Integer(9), false, options).unwrap();
    assert_eq!(data, json(r#"{"a":{"b":1}}"#));
}

#[test]
fn create_missing_false_skips_padding_but_allows_in_range_index_write() {
    let mut data = json(r#"{"a":[1,2,3]}"#);
    let options = WriteOptions {
        create_missing: false,
        ..Default::default()
    };
    set(&mut data, "a[1]", Value::Integer(99), false, options).unwrap();
    assert_eq!(data, json(r#"{"a":[1,99,3]}"#));

    set(&mut data, "a[10]", Value::Integer(1), false, options).unwrap();
    assert_eq!(data, json(r#"{"a":[1,99,3]}"#));
}

#[test]
fn default_evaluator_refuses_custom_filter_registration() {
    let result = dictwalk::default().register_path_filter("custom", std::sync::Arc::new(|v: &Value, _, _| Ok(v.clone())));
    assert!(matches!(result, Err(Error::Forbidden { .. })));
}

#[test]
fn constructed_evaluator_accepts_custom_filter_registration() {
    let ev = Evaluator::new();
    ev.register_path_filter("triple", std::sync::Arc::new(|v: &Value, _, _| Ok(Value::Integer(v.as_i64().unwrap_or(0) * 3))))
        .unwrap();
    let data = json(r#"{"a":4}"#);
    assert_eq!(ev.get(&data, "a|$triple", Value::Null, true).unwrap(), Value::Integer(12));
}

#[test]
fn backend_env_var_validation_rejects_unknown_names() {
    assert!(dictwalk::resolve_backend(Some("node")).is_err());
    assert_eq!(dictwalk::resolve_backend(Some("rust")).unwrap(), "rust");
}

#[test]
fn not_equal_predicate_excludes_matching_element() {
    let data = json(r#"{"a":{"b":[{"id":1,"c":10},{"id":2,"c":20},{"id":3,"c":30}]}}"#);
    assert_eq!(get(&data, "a.b[?id!=2].c[]", Value::Null, true).unwrap(), Value::List(vec![Value::Integer(10), Value::Integer(30)]));
}

#[test]
fn root_identity_with_output_transform_passes_whole_root_through() {
    let data = json("4");
    assert_eq!(get(&data, ".|$double", Value::Null, true).unwrap(), Value::Integer(8));
}

#[test]
fn default_evaluator_refuses_filter_lookup() {
    let result = dictwalk::default().get_path_filter("double");
    assert!(matches!(result, Err(Error::Forbidden { .. })));
}
