//! The write walk backing `set`: materializes missing scaffolding per
//! [`WriteOptions`] while recursing the token list, mutating in place.
//!
//! Each token variant gets its own free function below; the token at the
//! head of the slice handles itself and recurses with the tail.

use crate::error::{Error, Result};
use crate::filter::FilterRegistry;
use crate::path::{CompareOp, Lhs, ListTarget, ParsedPath, PathToken, PredicateExpr, Rhs};
use crate::value::{Map, Value};

use super::{predicate_eval, resolve, WriteOptions};

/// Writes `new_value` at every location `parsed` targets in `root`, in
/// place. Strict mode pre-walks the token prefix (all but the last token)
/// in resolve-mode first; any resolution failure aborts before any
/// mutation happens.
pub fn set(
    root: &mut Value,
    parsed: &ParsedPath,
    path: &str,
    new_value: Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    strict: bool,
) -> Result<()> {
    tracing::debug!(path, strict, "writing value at path");
    if strict && !parsed.tokens.is_empty() {
        let prefix = &parsed.tokens[..parsed.tokens.len() - 1];
        resolve::resolve_tokens(root, prefix, path, registry)?;
    }
    let snapshot = root.clone();
    write_tokens(root, &parsed.tokens, &new_value, options, registry, path, &snapshot)
}

fn write_tokens(
    cursor: &mut Value,
    tokens: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let Some((tok, rest)) = tokens.split_first() else {
        // The bare "." identity path: replace the cursor wholesale.
        *cursor = resolve_new_value(cursor, new_value, registry, path, snapshot)?;
        return Ok(());
    };
    match tok {
        PathToken::Root => Ok(()),
        PathToken::KeyGet(k) => write_key_get(cursor, k, rest, new_value, options, registry, path, snapshot),
        PathToken::ListMap(target) => write_list_map(cursor, target, rest, new_value, options, registry, path, snapshot),
        PathToken::Index(target, i) => write_index(cursor, target, *i, rest, new_value, options, registry, path, snapshot),
        PathToken::Slice(target, s, e) => write_slice(cursor, target, *s, *e, rest, new_value, options, registry, path, snapshot),
        PathToken::Predicate(target, expr) => write_predicate(cursor, target, expr, rest, new_value, options, registry, path, snapshot),
        PathToken::Wildcard => write_wildcard(cursor, rest, new_value, options, registry, path, snapshot),
        PathToken::DeepWildcard => write_deep_wildcard(cursor, rest, new_value, options, registry, path, snapshot),
    }
}

fn new_container() -> Value {
    Value::Map(Map::new())
}

fn is_container(v: &Value) -> bool {
    matches!(v, Value::Map(_) | Value::List(_))
}

/// Coerces `cursor` into a map if it isn't one. Both flags must hold to
/// overwrite an incompatible existing value, matching the KeyGet terminal
/// policy (§4.7).
fn ensure_map<'a>(cursor: &'a mut Value, create_missing: bool, overwrite_incompatible: bool) -> Option<&'a mut Map> {
    if !matches!(cursor, Value::Map(_)) {
        if !create_missing || !overwrite_incompatible {
            return None;
        }
        *cursor = new_container();
    }
    match cursor {
        Value::Map(m) => Some(m),
        _ => unreachable!(),
    }
}

/// Resolves the list a `ListMap`/`Index`/`Slice`/`Predicate` token operates
/// on: either `cursor[key]` (coercing `cursor` to a map first) or `cursor`
/// itself for the root-list write shortcut.
fn with_list_target<'a>(cursor: &'a mut Value, target: &ListTarget, create_missing: bool, overwrite_incompatible: bool) -> Option<&'a mut Vec<Value>> {
    match target {
        ListTarget::SelfRoot => {
            if !matches!(cursor, Value::List(_)) {
                if !create_missing || !overwrite_incompatible {
                    return None;
                }
                *cursor = Value::List(Vec::new());
            }
            match cursor {
                Value::List(l) => Some(l),
                _ => unreachable!(),
            }
        }
        ListTarget::Key(k) => {
            let map = ensure_map(cursor, create_missing, overwrite_incompatible)?;
            let missing = !map.contains_key(k);
            let wrong_type = !missing && !matches!(map.get(k), Some(Value::List(_)));
            if missing {
                if !create_missing {
                    return None;
                }
                map.insert(k.clone(), Value::List(Vec::new()));
            } else if wrong_type {
                if !overwrite_incompatible {
                    return None;
                }
                map.insert(k.clone(), Value::List(Vec::new()));
            }
            match map.get_mut(k) {
                Some(Value::List(l)) => Some(l),
                _ => unreachable!(),
            }
        }
    }
}

fn write_key_get(
    cursor: &mut Value,
    k: &str,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let Some(map) = ensure_map(cursor, options.create_missing, options.overwrite_incompatible) else {
        return Ok(());
    };
    if rest.is_empty() {
        if !map.contains_key(k) && !options.create_missing {
            return Ok(());
        }
        let existing = map.get(k).cloned().unwrap_or(Value::Null);
        let resolved = resolve_new_value(&existing, new_value, registry, path, snapshot)?;
        map.insert(k.to_string(), resolved);
        return Ok(());
    }
    let missing = !map.contains_key(k);
    let wrong_type = !missing && !is_container(map.get(k).unwrap());
    if missing {
        if !options.create_missing {
            return Ok(());
        }
        map.insert(k.to_string(), new_container());
    } else if wrong_type {
        if !options.overwrite_incompatible {
            return Ok(());
        }
        map.insert(k.to_string(), new_container());
    }
    let child = map.get_mut(k).unwrap();
    write_tokens(child, rest, new_value, options, registry, path, snapshot)
}

fn write_list_map(
    cursor: &mut Value,
    target: &ListTarget,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let Some(list) = with_list_target(cursor, target, options.create_missing, options.overwrite_incompatible) else {
        return Ok(());
    };
    if rest.is_empty() {
        for item in list.iter_mut() {
            *item = resolve_new_value(item, new_value, registry, path, snapshot)?;
        }
        return Ok(());
    }
    if list.is_empty() {
        if !options.create_missing {
            return Ok(());
        }
        list.push(new_container());
    }
    for item in list.iter_mut() {
        if !is_container(item) {
            if !options.overwrite_incompatible {
                continue;
            }
            *item = new_container();
        }
        write_tokens(item, rest, new_value, options, registry, path, snapshot)?;
    }
    Ok(())
}

fn write_index(
    cursor: &mut Value,
    target: &ListTarget,
    i: i64,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let Some(list) = with_list_target(cursor, target, options.create_missing, options.overwrite_incompatible) else {
        return Ok(());
    };
    let idx = if i < 0 {
        let back = (-i) as usize;
        if back > list.len() {
            return Ok(());
        }
        list.len() - back
    } else {
        let forward = i as usize;
        if forward >= list.len() {
            if !options.create_missing {
                return Ok(());
            }
            while list.len() <= forward {
                list.push(Value::Null);
            }
        }
        forward
    };
    if rest.is_empty() {
        let existing = list[idx].clone();
        list[idx] = resolve_new_value(&existing, new_value, registry, path, snapshot)?;
        return Ok(());
    }
    if !is_container(&list[idx]) {
        if !options.overwrite_incompatible {
            return Ok(());
        }
        list[idx] = new_container();
    }
    write_tokens(&mut list[idx], rest, new_value, options, registry, path, snapshot)
}

fn write_slice(
    cursor: &mut Value,
    target: &ListTarget,
    s: Option<i64>,
    e: Option<i64>,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let Some(list) = with_list_target(cursor, target, options.create_missing, options.overwrite_incompatible) else {
        return Ok(());
    };
    let (start, end) = resolve::resolve_slice_bounds(s, e, list.len());
    if rest.is_empty() {
        for idx in start..end {
            let existing = list[idx].clone();
            list[idx] = resolve_new_value(&existing, new_value, registry, path, snapshot)?;
        }
        return Ok(());
    }
    for idx in start..end {
        if !is_container(&list[idx]) {
            if !options.overwrite_incompatible {
                continue;
            }
            list[idx] = new_container();
        }
        write_tokens(&mut list[idx], rest, new_value, options, registry, path, snapshot)?;
    }
    Ok(())
}

/// The create-match shape the write policy synthesizes from when a
/// predicate has no matches: a bare `key == literal` comparison (no filter
/// on either side). Returns `(key, raw_rhs_text)`.
fn create_match_fields(expr: &PredicateExpr) -> Option<(&str, &str)> {
    match expr {
        PredicateExpr::Compare {
            lhs: Lhs::Key(k),
            op: CompareOp::Eq,
            rhs: Rhs::Literal(_),
            rhs_raw,
        } => Some((k.as_str(), rhs_raw.as_str())),
        _ => None,
    }
}

fn write_predicate(
    cursor: &mut Value,
    target: &ListTarget,
    expr: &PredicateExpr,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let Some(list) = with_list_target(cursor, target, options.create_missing, options.overwrite_incompatible) else {
        return Ok(());
    };
    let mut matched: Vec<usize> = list.iter().enumerate().filter(|(_, item)| predicate_eval::matches(expr, item, registry)).map(|(i, _)| i).collect();
    if matched.is_empty() {
        if let Some((key, raw_rhs)) = create_match_fields(expr) {
            if options.create_missing && options.create_filter_match {
                let mut entry = Map::new();
                entry.insert(key.to_string(), Value::String(raw_rhs.trim().to_string()));
                list.push(Value::Map(entry));
                matched.push(list.len() - 1);
            }
        }
    }
    if rest.is_empty() {
        for idx in matched {
            let existing = list[idx].clone();
            list[idx] = resolve_new_value(&existing, new_value, registry, path, snapshot)?;
        }
        return Ok(());
    }
    for idx in matched {
        write_tokens(&mut list[idx], rest, new_value, options, registry, path, snapshot)?;
    }
    Ok(())
}

fn write_wildcard(
    cursor: &mut Value,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    match cursor {
        Value::Map(m) => {
            if rest.is_empty() {
                for (_, v) in m.iter_mut() {
                    *v = resolve_new_value(v, new_value, registry, path, snapshot)?;
                }
            } else {
                for (_, v) in m.iter_mut() {
                    write_tokens(v, rest, new_value, options, registry, path, snapshot)?;
                }
            }
            Ok(())
        }
        Value::List(l) => {
            if rest.is_empty() {
                for v in l.iter_mut() {
                    *v = resolve_new_value(v, new_value, registry, path, snapshot)?;
                }
            } else {
                for v in l.iter_mut() {
                    write_tokens(v, rest, new_value, options, registry, path, snapshot)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// `DeepWildcard` write descent. Per §4.7/§9, `create_missing` is forced
/// off for the whole descent: deep-wildcard writes only ever touch
/// structure that already exists.
fn write_deep_wildcard(
    cursor: &mut Value,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    let descend = options.for_deep_wildcard_descent();
    deep_wildcard_walk(cursor, rest, new_value, descend, registry, path, snapshot)
}

fn deep_wildcard_walk(
    node: &mut Value,
    rest: &[PathToken],
    new_value: &Value,
    options: WriteOptions,
    registry: &FilterRegistry,
    path: &str,
    snapshot: &Value,
) -> Result<()> {
    match node {
        Value::Map(m) => {
            for (_, child) in m.iter_mut() {
                if rest.is_empty() {
                    *child = resolve_new_value(child, new_value, registry, path, snapshot)?;
                } else {
                    write_tokens(child, rest, new_value, options, registry, path, snapshot)?;
                }
                if is_container(child) {
                    deep_wildcard_walk(child, rest, new_value, options, registry, path, snapshot)?;
                }
            }
            Ok(())
        }
        Value::List(l) => {
            for child in l.iter_mut() {
                if rest.is_empty() {
                    *child = resolve_new_value(child, new_value, registry, path, snapshot)?;
                } else {
                    write_tokens(child, rest, new_value, options, registry, path, snapshot)?;
                }
                if is_container(child) {
                    deep_wildcard_walk(child, rest, new_value, options, registry, path, snapshot)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Resolves the value actually written at a terminal token (§4.7):
/// a `$$root[...]` reference reads from the pre-mutation snapshot, a bare
/// `$...` string applies a filter pipeline to the existing value, anything
/// else is used verbatim.
fn resolve_new_value(existing: &Value, new_value: &Value, registry: &FilterRegistry, path: &str, snapshot: &Value) -> Result<Value> {
    if let Value::String(s) = new_value {
        if let Some(root_ref) = crate::filter::pipeline::parse_root_ref(path, s)? {
            let parsed = crate::path::parse_for_read(&root_ref.subpath)?;
            let mut resolved = resolve::resolve(snapshot, &parsed, &root_ref.subpath, registry)?;
            if let Some(pipeline) = &root_ref.pipeline {
                resolved = pipeline.apply(&resolved, registry)?;
            }
            return Ok(resolved);
        }
        if s.starts_with('$') {
            let pipeline = crate::filter::pipeline::parse_pipeline(path, s)?;
            return pipeline.apply(existing, registry);
        }
    }
    Ok(new_value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_for_write;

    fn reg() -> FilterRegistry {
        FilterRegistry::new()
    }

    #[test]
    fn scalar_key_set_round_trips() {
        let mut root = Value::Map(Map::new());
        let parsed = parse_for_write("a.b.c").unwrap();
        set(&mut root, &parsed, "a.b.c", Value::Integer(1), WriteOptions::default(), &reg(), false).unwrap();
        let got = resolve::resolve(&root, &parsed, "a.b.c", &reg()).unwrap();
        assert_eq!(got, Value::Integer(1));
    }

    #[test]
    fn create_missing_false_is_a_no_op() {
        let mut root = Value::Map(Map::new());
        let parsed = parse_for_write("a.b").unwrap();
        let opts = WriteOptions {
            create_missing: false,
            ..Default::default()
        };
        set(&mut root, &parsed, "a.b", Value::Integer(1), opts, &reg(), false).unwrap();
        assert_eq!(root, Value::Map(Map::new()));
    }

    #[test]
    fn predicate_create_match_synthesizes_string_literal_field() {
        let mut root = Value::Map(Map::new());
        let parsed = parse_for_write("a.b[?id==3].c").unwrap();
        set(&mut root, &parsed, "a.b[?id==3].c", Value::Integer(5), WriteOptions::default(), &reg(), false).unwrap();

        let expected: Value = serde_json::from_str(r#"{"a":{"b":[{"id":"3","c":5}]}}"#).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn list_map_write_transforms_every_item_via_root_reference() {
        let mut root: Value = serde_json::from_str(r#"{"a":{"b":[{"v":1},{"v":2},{"v":3}]},"d":9}"#).unwrap();
        let parsed = parse_for_write("a.b[].v").unwrap();
        set(&mut root, &parsed, "a.b[].v", Value::String("$$root.d|$double".into()), WriteOptions::default(), &reg(), false).unwrap();

        let get_parsed = crate::path::parse_for_read("a.b[].v").unwrap();
        let got = resolve::resolve(&root, &get_parsed, "a.b[].v", &reg()).unwrap();
        assert_eq!(got, Value::List(vec![Value::Integer(18), Value::Integer(18), Value::Integer(18)]));
    }

    #[test]
    fn root_list_shortcut_write_targets_root_document() {
        let mut root: Value = serde_json::from_str(r#"[{"id":1},{"id":2}]"#).unwrap();
        let parsed = parse_for_write(".[?id==2]").unwrap();
        set(&mut root, &parsed, ".[?id==2]", Value::String("matched".into()), WriteOptions::default(), &reg(), false).unwrap();
        let expected: Value = serde_json::from_str(r#"[{"id":1},"matched"]"#).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn strict_write_propagates_prefix_resolution_error() {
        let mut root = Value::Map(Map::new());
        let parsed = parse_for_write("a.b.c").unwrap();
        let err = set(&mut root, &parsed, "a.b.c", Value::Integer(1), WriteOptions::default(), &reg(), true).unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }
}
