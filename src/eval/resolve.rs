//! The read walk backing `get`/`exists`: resolves a token list against a
//! document, fanning out on `ListMap`/`Wildcard`/`DeepWildcard`/`Predicate`
//! and narrowing on everything else.

use crate::error::{Error, Result};
use crate::filter::FilterRegistry;
use crate::path::{ListTarget, ParsedPath, PathToken};
use crate::value::Value;

use super::{describe_token, predicate_eval, Cursor};

/// Resolves `parsed` against `root`, applying the output transform (if
/// any) to the final value. Strict errors propagate; callers in
/// non-strict contexts should inspect [`Error::is_non_strict_swallowable`].
pub fn resolve(root: &Value, parsed: &ParsedPath, path: &str, registry: &FilterRegistry) -> Result<Value> {
    let mut value = resolve_tokens(root, &parsed.tokens, path, registry)?;
    if let Some(transform) = &parsed.transform {
        let pipeline = crate::filter::pipeline::parse_pipeline(path, transform)?;
        value = pipeline.apply(&value, registry)?;
    }
    Ok(value)
}

/// Resolves a bare token slice against `root`, with no output transform.
/// Shared by the strict write/unset prefix pre-check, which re-walks the
/// token list in resolve-mode to get the strict-error contract without
/// rolling back a partially applied mutation.
pub fn resolve_tokens(root: &Value, tokens: &[PathToken], path: &str, registry: &FilterRegistry) -> Result<Value> {
    let mut cursor = Cursor::One(root.clone());
    for tok in tokens {
        cursor = step(cursor, tok, root, path, registry)?;
    }
    Ok(cursor.into_value())
}

fn step(cursor: Cursor, tok: &PathToken, root: &Value, path: &str, registry: &FilterRegistry) -> Result<Cursor> {
    if let PathToken::Root = tok {
        return Ok(Cursor::One(root.clone()));
    }
    match cursor {
        Cursor::One(v) => match step_one(tok, &v, path, registry, false)? {
            StepResult::One(x) => Ok(Cursor::One(x)),
            StepResult::Many(xs) => Ok(Cursor::Many(xs)),
        },
        Cursor::Many(items) => {
            let mut out = Vec::new();
            for item in items {
                if let Ok(sr) = step_one(tok, &item, path, registry, true) {
                    match sr {
                        StepResult::One(x) => out.push(x),
                        StepResult::Many(xs) => out.extend(xs),
                    }
                }
            }
            Ok(Cursor::Many(out))
        }
    }
}

enum StepResult {
    One(Value),
    Many(Vec<Value>),
}

/// Applies one token to a single value. `already_fanned` is true when this
/// call happens inside an existing fan-out (the cursor was already
/// `Many`); `ListMap` relaxes its "must be a list" rule in that position so
/// a scalar field projects through as a singleton rather than vanishing
/// (needed for pipelines like `a.b[?…].c[]|$sum` where `c` is a scalar).
fn step_one(tok: &PathToken, v: &Value, path: &str, registry: &FilterRegistry, already_fanned: bool) -> Result<StepResult> {
    match tok {
        PathToken::Root => unreachable!("handled in step()"),
        PathToken::KeyGet(k) => {
            let m = v
                .as_map()
                .ok_or_else(|| Error::resolution(path, k.clone(), format!("expected a map, found {}", v.type_name())))?;
            let val = m.get(k).cloned().ok_or_else(|| Error::resolution(path, k.clone(), format!("missing key `{k}`")))?;
            Ok(StepResult::One(val))
        }
        PathToken::ListMap(target) => {
            let val = target_value(v, target, path, tok)?;
            match val {
                Value::List(items) => Ok(StepResult::Many(items)),
                other if already_fanned => Ok(StepResult::One(other)),
                other => Err(Error::resolution(path, describe_token(tok), format!("expected a list, found {}", other.type_name()))),
            }
        }
        PathToken::Index(target, i) => {
            let list = target_list(v, target, path, tok)?;
            let idx = normalize_index(*i, list.len()).ok_or_else(|| {
                Error::resolution(path, describe_token(tok), format!("index {i} out of range for a list of length {}", list.len()))
            })?;
            Ok(StepResult::One(list[idx].clone()))
        }
        PathToken::Slice(target, s, e) => {
            let list = target_list(v, target, path, tok)?;
            Ok(StepResult::One(Value::List(slice(&list, *s, *e))))
        }
        PathToken::Predicate(target, expr) => {
            let list = target_list(v, target, path, tok)?;
            let matched = list.into_iter().filter(|item| predicate_eval::matches(expr, item, registry)).collect();
            Ok(StepResult::Many(matched))
        }
        PathToken::Wildcard => Ok(StepResult::Many(fan_children(v, path, tok)?)),
        PathToken::DeepWildcard => Ok(StepResult::Many(fan_descendants(v, path, tok)?)),
    }
}

fn target_value(v: &Value, target: &ListTarget, path: &str, tok: &PathToken) -> Result<Value> {
    match target {
        ListTarget::Key(k) => {
            let m = v
                .as_map()
                .ok_or_else(|| Error::resolution(path, describe_token(tok), format!("expected a map, found {}", v.type_name())))?;
            m.get(k).cloned().ok_or_else(|| Error::resolution(path, describe_token(tok), format!("missing key `{k}`")))
        }
        ListTarget::SelfRoot => Ok(v.clone()),
    }
}

fn target_list(v: &Value, target: &ListTarget, path: &str, tok: &PathToken) -> Result<Vec<Value>> {
    match target_value(v, target, path, tok)? {
        Value::List(l) => Ok(l),
        other => Err(Error::resolution(path, describe_token(tok), format!("expected a list, found {}", other.type_name()))),
    }
}

fn fan_children(v: &Value, path: &str, tok: &PathToken) -> Result<Vec<Value>> {
    match v {
        Value::Map(_) | Value::List(_) => Ok(v.children()),
        _ => Err(Error::resolution(path, describe_token(tok), format!("cannot fan out over a {}", v.type_name()))),
    }
}

fn fan_descendants(v: &Value, path: &str, tok: &PathToken) -> Result<Vec<Value>> {
    match v {
        Value::Map(_) | Value::List(_) => Ok(v.descendants()),
        _ => Err(Error::resolution(path, describe_token(tok), format!("cannot fan out over a {}", v.type_name()))),
    }
}

/// Resolves a possibly-negative index against `len`, Python-style.
/// Returns `None` when out of range.
pub(crate) fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len_i = len as i64;
    let idx = if i < 0 { len_i + i } else { i };
    if idx < 0 || idx >= len_i {
        None
    } else {
        Some(idx as usize)
    }
}

/// Resolves slice bounds against `len`, Python-style (clamped, never
/// errors on out-of-range bounds).
pub(crate) fn resolve_slice_bounds(s: Option<i64>, e: Option<i64>, len: usize) -> (usize, usize) {
    let len_i = len as i64;
    let clamp = |i: i64| -> i64 {
        let i = if i < 0 { len_i + i } else { i };
        i.clamp(0, len_i)
    };
    let start = s.map(clamp).unwrap_or(0);
    let end = e.map(clamp).unwrap_or(len_i);
    if start >= end {
        (0, 0)
    } else {
        (start as usize, end as usize)
    }
}

fn slice(list: &[Value], s: Option<i64>, e: Option<i64>) -> Vec<Value> {
    let (start, end) = resolve_slice_bounds(s, e, list.len());
    list[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_for_read;

    fn reg() -> FilterRegistry {
        FilterRegistry::new()
    }

    #[test]
    fn simple_key_get_chain() {
        let root: Value = serde_json::from_str(r#"{"a":{"b":{"c":1}}}"#).unwrap();
        let parsed = parse_for_read("a.b.c").unwrap();
        let out = resolve(&root, &parsed, "a.b.c", &reg()).unwrap();
        assert_eq!(out, Value::Integer(1));
    }

    #[test]
    fn predicate_fan_out_then_keyget_then_listmap_scalar_projection() {
        let root: Value = serde_json::from_str(
            r#"{"a":{"b":[{"id":1,"c":1},{"id":2,"c":2},{"id":3,"c":3},{"id":4,"c":4},{"id":5,"c":5},{"id":6,"c":6}]}}"#,
        )
        .unwrap();
        let parsed = parse_for_read("a.b[?id==$even].c[]").unwrap();
        let out = resolve(&root, &parsed, "a.b[?id==$even].c[]", &reg()).unwrap();
        assert_eq!(out, Value::List(vec![Value::Integer(2), Value::Integer(4), Value::Integer(6)]));
    }

    #[test]
    fn scenario_two_full_pipeline() {
        let root: Value = serde_json::from_str(
            r#"{"a":{"b":[{"id":1,"c":1},{"id":2,"c":2},{"id":3,"c":3},{"id":4,"c":4},{"id":5,"c":5},{"id":6,"c":6}]}}"#,
        )
        .unwrap();
        let path = "a.b[?id==$even].c[]|$add(2)[]|$double[]|$pow(2)[]|$sum";
        let parsed = parse_for_read(path).unwrap();
        let out = resolve(&root, &parsed, path, &reg()).unwrap();
        assert_eq!(out, Value::Integer(464));
    }

    #[test]
    fn stringwise_fallback_scenario() {
        let root: Value = serde_json::from_str(r#"{"a":{"b":[{"id":"1","c":10},{"id":"2","c":20}]}}"#).unwrap();
        let parsed = parse_for_read("a.b[?id==1].c[]").unwrap();
        let out = resolve(&root, &parsed, "a.b[?id==1].c[]", &reg()).unwrap();
        assert_eq!(out, Value::List(vec![Value::Integer(10)]));
    }

    #[test]
    fn root_identity_path() {
        let root: Value = serde_json::from_str(r#"{"x":1}"#).unwrap();
        let parsed = parse_for_read(".").unwrap();
        let out = resolve(&root, &parsed, ".", &reg()).unwrap();
        assert_eq!(out, root);
    }

    #[test]
    fn missing_key_is_resolution_error() {
        let root: Value = serde_json::from_str(r#"{"a":1}"#).unwrap();
        let parsed = parse_for_read("a.b").unwrap();
        let err = resolve(&root, &parsed, "a.b", &reg()).unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[test]
    fn deep_wildcard_collects_all_descendants() {
        let root: Value = serde_json::from_str(r#"{"a":{"b":1,"c":[2,3]}}"#).unwrap();
        let parsed = parse_for_read("**").unwrap();
        let out = resolve(&root, &parsed, "**", &reg()).unwrap();
        let Value::List(items) = out else { panic!("expected list") };
        assert!(items.contains(&Value::Integer(1)));
        assert!(items.contains(&Value::Integer(2)));
        assert!(items.contains(&Value::Integer(3)));
    }
}
