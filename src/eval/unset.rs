//! The removal walk backing `unset`: like [`super::set`] but never creates
//! scaffolding — a missing intermediate key or out-of-range index simply
//! means there is nothing to remove.

use crate::error::Result;
use crate::filter::FilterRegistry;
use crate::path::{ListTarget, ParsedPath, PathToken};
use crate::value::Value;

use super::{predicate_eval, resolve};

/// Removes every location `parsed` targets in `root`, in place. Strict mode
/// pre-walks the *entire* token list in resolve-mode first (unlike `set`,
/// which only checks the prefix): an unset's terminal token must itself
/// resolve, since there is no "create it instead" fallback for the thing
/// being removed.
pub fn unset(root: &mut Value, parsed: &ParsedPath, path: &str, registry: &FilterRegistry, strict: bool) -> Result<()> {
    tracing::debug!(path, strict, "removing path");
    if strict {
        resolve::resolve_tokens(root, &parsed.tokens, path, registry)?;
    }
    unset_tokens(root, &parsed.tokens, registry)
}

fn unset_tokens(cursor: &mut Value, tokens: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    let Some((tok, rest)) = tokens.split_first() else {
        // unset(".") is a no-op: there is no parent to remove the root from.
        return Ok(());
    };
    match tok {
        PathToken::Root => Ok(()),
        PathToken::KeyGet(k) => unset_key_get(cursor, k, rest, registry),
        PathToken::ListMap(target) => unset_list_map(cursor, target, rest, registry),
        PathToken::Index(target, i) => unset_index(cursor, target, *i, rest, registry),
        PathToken::Slice(target, s, e) => unset_slice(cursor, target, *s, *e, rest, registry),
        PathToken::Predicate(target, expr) => unset_predicate(cursor, target, expr, rest, registry),
        PathToken::Wildcard => unset_wildcard(cursor, rest, registry),
        PathToken::DeepWildcard => unset_deep_wildcard(cursor, rest, registry),
    }
}

fn is_container(v: &Value) -> bool {
    matches!(v, Value::Map(_) | Value::List(_))
}

/// Resolves the list a non-creating token operates on, without ever
/// materializing missing structure.
fn list_target_mut_noncreating<'a>(cursor: &'a mut Value, target: &ListTarget) -> Option<&'a mut Vec<Value>> {
    match target {
        ListTarget::SelfRoot => cursor.as_list_mut(),
        ListTarget::Key(k) => cursor.as_map_mut()?.get_mut(k)?.as_list_mut(),
    }
}

fn unset_key_get(cursor: &mut Value, k: &str, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    let Some(map) = cursor.as_map_mut() else {
        return Ok(());
    };
    if rest.is_empty() {
        map.shift_remove(k);
        return Ok(());
    }
    let Some(child) = map.get_mut(k) else {
        return Ok(());
    };
    unset_tokens(child, rest, registry)
}

fn unset_list_map(cursor: &mut Value, target: &ListTarget, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    let Some(list) = list_target_mut_noncreating(cursor, target) else {
        return Ok(());
    };
    if rest.is_empty() {
        list.clear();
        return Ok(());
    }
    for item in list.iter_mut() {
        if is_container(item) {
            unset_tokens(item, rest, registry)?;
        }
    }
    Ok(())
}

fn unset_index(cursor: &mut Value, target: &ListTarget, i: i64, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    let Some(list) = list_target_mut_noncreating(cursor, target) else {
        return Ok(());
    };
    let Some(idx) = resolve::normalize_index(i, list.len()) else {
        return Ok(());
    };
    if rest.is_empty() {
        list.remove(idx);
        return Ok(());
    }
    if is_container(&list[idx]) {
        unset_tokens(&mut list[idx], rest, registry)?;
    }
    Ok(())
}

fn unset_slice(cursor: &mut Value, target: &ListTarget, s: Option<i64>, e: Option<i64>, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    let Some(list) = list_target_mut_noncreating(cursor, target) else {
        return Ok(());
    };
    let (start, end) = resolve::resolve_slice_bounds(s, e, list.len());
    if rest.is_empty() {
        list.drain(start..end);
        return Ok(());
    }
    for idx in start..end {
        if is_container(&list[idx]) {
            unset_tokens(&mut list[idx], rest, registry)?;
        }
    }
    Ok(())
}

fn unset_predicate(cursor: &mut Value, target: &ListTarget, expr: &crate::path::PredicateExpr, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    let Some(list) = list_target_mut_noncreating(cursor, target) else {
        return Ok(());
    };
    if rest.is_empty() {
        list.retain(|item| !predicate_eval::matches(expr, item, registry));
        return Ok(());
    }
    let matched: Vec<usize> = list.iter().enumerate().filter(|(_, item)| predicate_eval::matches(expr, item, registry)).map(|(i, _)| i).collect();
    for idx in matched {
        if is_container(&list[idx]) {
            unset_tokens(&mut list[idx], rest, registry)?;
        }
    }
    Ok(())
}

fn unset_wildcard(cursor: &mut Value, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    match cursor {
        Value::Map(m) => {
            if rest.is_empty() {
                m.clear();
            } else {
                for (_, v) in m.iter_mut() {
                    if is_container(v) {
                        unset_tokens(v, rest, registry)?;
                    }
                }
            }
            Ok(())
        }
        Value::List(l) => {
            if rest.is_empty() {
                l.clear();
            } else {
                for v in l.iter_mut() {
                    if is_container(v) {
                        unset_tokens(v, rest, registry)?;
                    }
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn unset_deep_wildcard(cursor: &mut Value, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    if rest.is_empty() {
        clear_all_descendant_containers(cursor);
        return Ok(());
    }
    deep_wildcard_unset_walk(cursor, rest, registry)
}

fn deep_wildcard_unset_walk(node: &mut Value, rest: &[PathToken], registry: &FilterRegistry) -> Result<()> {
    match node {
        Value::Map(m) => {
            for (_, child) in m.iter_mut() {
                if is_container(child) {
                    unset_tokens(child, rest, registry)?;
                    deep_wildcard_unset_walk(child, rest, registry)?;
                }
            }
            Ok(())
        }
        Value::List(l) => {
            for child in l.iter_mut() {
                if is_container(child) {
                    unset_tokens(child, rest, registry)?;
                    deep_wildcard_unset_walk(child, rest, registry)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Clears every container that has no container child of its own — the
/// deepest container in each branch — leaving ancestor maps/lists with
/// their keys/indices intact (now pointing at emptied containers) rather
/// than collapsing every level back to nothing. A node whose children are
/// themselves all scalars or already-emptied containers is a leaf for this
/// purpose and gets cleared; a node with at least one container child is
/// left structurally alone once that child has been cleared.
fn clear_all_descendant_containers(node: &mut Value) {
    match node {
        Value::Map(m) => {
            let mut has_container_child = false;
            for (_, child) in m.iter_mut() {
                if is_container(child) {
                    has_container_child = true;
                    clear_all_descendant_containers(child);
                }
            }
            if !has_container_child {
                m.clear();
            }
        }
        Value::List(l) => {
            let mut has_container_child = false;
            for child in l.iter_mut() {
                if is_container(child) {
                    has_container_child = true;
                    clear_all_descendant_containers(child);
                }
            }
            if !has_container_child {
                l.clear();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::resolve;
    use crate::path::parse_for_write;
    use crate::value::Map;

    fn reg() -> FilterRegistry {
        FilterRegistry::new()
    }

    #[test]
    fn key_get_removes_leaf() {
        let mut root: Value = serde_json::from_str(r#"{"a":{"b":1,"c":2}}"#).unwrap();
        let parsed = parse_for_write("a.b").unwrap();
        unset(&mut root, &parsed, "a.b", &reg(), false).unwrap();
        let expected: Value = serde_json::from_str(r#"{"a":{"c":2}}"#).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn missing_path_is_a_no_op_when_non_strict() {
        let mut root = Value::Map(Map::new());
        let parsed = parse_for_write("a.b").unwrap();
        unset(&mut root, &parsed, "a.b", &reg(), false).unwrap();
        assert_eq!(root, Value::Map(Map::new()));
    }

    #[test]
    fn strict_missing_path_errors() {
        let mut root = Value::Map(Map::new());
        let parsed = parse_for_write("a.b").unwrap();
        assert!(unset(&mut root, &parsed, "a.b", &reg(), true).is_err());
    }

    #[test]
    fn predicate_unset_removes_matching_items() {
        let mut root: Value = serde_json::from_str(r#"{"a":[{"id":1},{"id":2},{"id":3}]}"#).unwrap();
        let parsed = parse_for_write("a[?id==2]").unwrap();
        unset(&mut root, &parsed, "a[?id==2]", &reg(), false).unwrap();
        let expected: Value = serde_json::from_str(r#"{"a":[{"id":1},{"id":3}]}"#).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn deep_wildcard_terminal_clears_every_container() {
        let mut root: Value = serde_json::from_str(r#"{"a":{"b":[1,2],"c":{"d":3}},"e":4}"#).unwrap();
        let parsed = parse_for_write("**").unwrap();
        unset(&mut root, &parsed, "**", &reg(), false).unwrap();
        let expected: Value = serde_json::from_str(r#"{"a":{"b":[],"c":{}},"e":4}"#).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn dot_path_unset_is_a_no_op() {
        let mut root: Value = serde_json::from_str(r#"{"a":1}"#).unwrap();
        let parsed = parse_for_write(".").unwrap();
        unset(&mut root, &parsed, ".", &reg(), false).unwrap();
        let expected: Value = serde_json::from_str(r#"{"a":1}"#).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn slice_unset_removes_range() {
        let mut root: Value = serde_json::from_str(r#"{"a":[1,2,3,4,5]}"#).unwrap();
        let parsed = parse_for_write("a[1:3]").unwrap();
        unset(&mut root, &parsed, "a[1:3]", &reg(), false).unwrap();
        let get_parsed = crate::path::parse_for_read("a").unwrap();
        let got = resolve::resolve(&root, &get_parsed, "a", &reg()).unwrap();
        assert_eq!(got, Value::List(vec![Value::Integer(1), Value::Integer(4), Value::Integer(5)]));
    }
}
