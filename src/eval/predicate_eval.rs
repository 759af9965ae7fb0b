//! Evaluates a parsed [`PredicateExpr`] against a single candidate item.

use std::cmp::Ordering;

use crate::error::Result;
use crate::filter::FilterRegistry;
use crate::path::{BoolExpr, CompareOp, Lhs, PredicateExpr, Rhs};
use crate::value::Value;

/// Non-strict: a filter or comparison error inside a predicate is treated
/// as "does not match" rather than aborting the whole traversal, matching
/// the spec's "caught the same way as a resolution failure" rule (callers
/// in strict contexts should inspect the `Err` case themselves instead of
/// calling this helper; `matches` is the forgiving entry point used by
/// reads and non-strict filtering).
pub fn matches(expr: &PredicateExpr, item: &Value, registry: &FilterRegistry) -> bool {
    eval(expr, item, registry).unwrap_or(false)
}

pub fn eval(expr: &PredicateExpr, item: &Value, registry: &FilterRegistry) -> Result<bool> {
    match expr {
        PredicateExpr::Compare { lhs, op, rhs, .. } => eval_compare(lhs, *op, rhs, item, registry),
        PredicateExpr::Bool(b) => eval_bool(b, item, registry),
    }
}

fn eval_bool(expr: &BoolExpr, item: &Value, registry: &FilterRegistry) -> Result<bool> {
    match expr {
        BoolExpr::Operand(pipeline) => Ok(pipeline.apply(item, registry)?.is_truthy()),
        BoolExpr::Not(inner) => Ok(!eval_bool(inner, item, registry)?),
        BoolExpr::And(a, b) => Ok(eval_bool(a, item, registry)? && eval_bool(b, item, registry)?),
        BoolExpr::Or(a, b) => Ok(eval_bool(a, item, registry)? || eval_bool(b, item, registry)?),
    }
}

fn resolve_lhs(lhs: &Lhs, item: &Value, registry: &FilterRegistry) -> Result<Value> {
    Ok(match lhs {
        Lhs::Key(k) => item.as_map().and_then(|m| m.get(k)).cloned().unwrap_or(Value::Null),
        Lhs::Itself => item.clone(),
        Lhs::Pipeline(p) => p.apply(item, registry)?,
    })
}

fn eval_compare(lhs: &Lhs, op: CompareOp, rhs: &Rhs, item: &Value, registry: &FilterRegistry) -> Result<bool> {
    let lhs_value = resolve_lhs(lhs, item, registry)?;

    if let Rhs::Pipeline(p) = rhs {
        let result = p.apply(&lhs_value, registry)?;
        let truthy = result.is_truthy();
        return Ok(match op {
            CompareOp::Eq => truthy,
            CompareOp::Ne => !truthy,
            _ => unreachable!("ordered operators with a filter rhs are rejected at parse time"),
        });
    }

    let Rhs::Literal(lit) = rhs else { unreachable!() };
    let rhs_value = lit.clone().into_value();

    Ok(match op {
        CompareOp::Eq => values_equal(&lhs_value, &rhs_value),
        CompareOp::Ne => !values_equal(&lhs_value, &rhs_value),
        CompareOp::Gt => compare_ordered(&lhs_value, &rhs_value) == Some(Ordering::Greater),
        CompareOp::Lt => compare_ordered(&lhs_value, &rhs_value) == Some(Ordering::Less),
        CompareOp::Ge => matches!(compare_ordered(&lhs_value, &rhs_value), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Le => matches!(compare_ordered(&lhs_value, &rhs_value), Some(Ordering::Less | Ordering::Equal)),
    })
}

/// `==`/`!=` equality with the stringwise backward-compatibility fallback:
/// `[?id==1]` matches `{"id":"1"}` because `"1" == "1"` stringified, even
/// though `Value::String("1") != Value::Integer(1)` structurally.
fn values_equal(a: &Value, b: &Value) -> bool {
    if numeric_equal(a, b) {
        return true;
    }
    if a == b {
        return true;
    }
    a.to_string() == b.to_string()
}

fn numeric_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if matches!(a, Value::Integer(_) | Value::Float(_)) && matches!(b, Value::Integer(_) | Value::Float(_)) => x == y,
        _ => false,
    }
}

/// Ordered comparison with the two documented fallbacks: reparse the field
/// value as a literal if the natural comparison is undefined, then fall
/// back to comparing stringified forms.
fn compare_ordered(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    if let Some(ord) = lhs.partial_cmp(rhs) {
        return Some(ord);
    }
    if let Value::String(s) = lhs {
        if let Ok(lit) = crate::path::literal::parse_literal("", s) {
            let reparsed = lit.into_value();
            if let Some(ord) = reparsed.partial_cmp(rhs) {
                return Some(ord);
            }
        }
    }
    lhs.to_string().partial_cmp(&rhs.to_string())
}
