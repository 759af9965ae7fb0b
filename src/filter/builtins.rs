//! The default filter-function catalogue.
//!
//! Each entry follows the obvious arithmetic/string/temporal meaning for its
//! name. `div`/`mod` by zero and `sqrt`/`log` of non-positive inputs yield
//! `Null` rather than erroring, matching a forgiving-pipeline design: a bad
//! input degrades one element of a pipeline instead of aborting the whole
//! evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::path::literal::Literal;
use crate::value::Value;

use super::registry::{FilterFn, FilterRegistry};

pub fn register_all(reg: &FilterRegistry) {
    macro_rules! reg {
        ($name:literal, $f:expr) => {
            reg.register($name, Arc::new($f) as FilterFn).expect("unfrozen registry");
        };
    }

    reg!("inc", |v: &Value, _, _| numeric_unary(v, |x| x + 1.0));
    reg!("dec", |v: &Value, _, _| numeric_unary(v, |x| x - 1.0));
    reg!("double", |v: &Value, _, _| numeric_unary(v, |x| x * 2.0));
    reg!("square", |v: &Value, _, _| numeric_unary(v, |x| x * x));
    reg!("neg", |v: &Value, _, _| numeric_unary(v, |x| -x));
    reg!("sign", |v: &Value, _, _| numeric_unary(v, f64::signum));
    reg!("abs", |v: &Value, _, _| numeric_unary(v, f64::abs));
    reg!("sqrt", |v: &Value, _, _| {
        let x = require_f64(v)?;
        Ok(if x > 0.0 { Value::Float(x.sqrt()) } else { Value::Null })
    });
    reg!("log", |v: &Value, _, _| {
        let x = require_f64(v)?;
        Ok(if x > 0.0 { Value::Float(x.ln()) } else { Value::Null })
    });
    reg!("exp", |v: &Value, _, _| numeric_unary(v, f64::exp));
    reg!("floor", |v: &Value, _, _| numeric_unary(v, f64::floor));
    reg!("ceil", |v: &Value, _, _| numeric_unary(v, f64::ceil));
    reg!("even", |v: &Value, _, _| Ok(Value::Bool(require_i64(v)?.rem_euclid(2) == 0)));
    reg!("odd", |v: &Value, _, _| Ok(Value::Bool(require_i64(v)?.rem_euclid(2) != 0)));
    reg!("bool", |v: &Value, _, _| Ok(Value::Bool(v.is_truthy())));
    reg!("string", |v: &Value, _, _| Ok(Value::String(v.to_string())));
    reg!("int", |v: &Value, _, _| {
        Ok(match v {
            Value::String(s) => s.trim().parse::<i64>().map(Value::Integer).unwrap_or(Value::Null),
            other => other.as_i64().map(Value::Integer).unwrap_or(Value::Null),
        })
    });
    reg!("float", |v: &Value, _, _| {
        Ok(match v {
            Value::String(s) => s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
            other => other.as_f64().map(Value::Float).unwrap_or(Value::Null),
        })
    });
    reg!("decimal", |v: &Value, args, _| {
        let ndigits = curried_i64(args, 0).unwrap_or(2) as usize;
        let x = require_f64(v)?;
        Ok(Value::Float(round_to(x, ndigits)))
    });
    reg!("round", |v: &Value, args, _| {
        let ndigits = curried_i64(args, 0).unwrap_or(0);
        let x = require_f64(v)?;
        Ok(if ndigits <= 0 {
            Value::Integer(round_to(x, 0) as i64)
        } else {
            Value::Float(round_to(x, ndigits as usize))
        })
    });
    reg!("quote", |v: &Value, _, _| Ok(Value::String(format!("\"{v}\""))));

    reg!("gt", |v: &Value, args, _| compare_curried(v, args, |a, b| a > b));
    reg!("lt", |v: &Value, args, _| compare_curried(v, args, |a, b| a < b));
    reg!("gte", |v: &Value, args, _| compare_curried(v, args, |a, b| a >= b));
    reg!("lte", |v: &Value, args, _| compare_curried(v, args, |a, b| a <= b));
    reg!("between", |v: &Value, args, _| {
        let x = require_f64(v)?;
        let lo = curried_f64(args, 0).ok_or_else(|| missing_arg("between", "low"))?;
        let hi = curried_f64(args, 1).ok_or_else(|| missing_arg("between", "high"))?;
        Ok(Value::Bool(x >= lo && x <= hi))
    });
    reg!("clamp", |v: &Value, args, _| {
        let x = require_f64(v)?;
        let lo = curried_f64(args, 0).ok_or_else(|| missing_arg("clamp", "low"))?;
        let hi = curried_f64(args, 1).ok_or_else(|| missing_arg("clamp", "high"))?;
        Ok(Value::Float(x.clamp(lo, hi)))
    });

    reg!("add", |v: &Value, args, _| binary_curried(v, args, |a, b| a + b));
    reg!("sub", |v: &Value, args, _| binary_curried(v, args, |a, b| a - b));
    reg!("mul", |v: &Value, args, _| binary_curried(v, args, |a, b| a * b));
    reg!("div", |v: &Value, args, _| {
        let a = require_f64(v)?;
        let b = curried_f64(args, 0).ok_or_else(|| missing_arg("div", "divisor"))?;
        Ok(if b == 0.0 { Value::Null } else { Value::Float(a / b) })
    });
    reg!("mod", |v: &Value, args, _| {
        let a = require_i64(v)?;
        let b = curried_i64(args, 0).ok_or_else(|| missing_arg("mod", "divisor"))?;
        Ok(if b == 0 { Value::Null } else { Value::Integer(a.rem_euclid(b)) })
    });
    reg!("pow", |v: &Value, args, _| {
        let a = require_f64(v)?;
        let b = curried_f64(args, 0).ok_or_else(|| missing_arg("pow", "exponent"))?;
        Ok(Value::Float(a.powf(b)))
    });
    reg!("rpow", |v: &Value, args, _| {
        let a = require_f64(v)?;
        let base = curried_f64(args, 0).ok_or_else(|| missing_arg("rpow", "base"))?;
        Ok(Value::Float(base.powf(a)))
    });
    reg!("root", |v: &Value, args, _| {
        let a = require_f64(v)?;
        let n = curried_f64(args, 0).unwrap_or(2.0);
        Ok(if a < 0.0 { Value::Null } else { Value::Float(a.powf(1.0 / n)) })
    });
    reg!("pct", |v: &Value, args, _| {
        let a = require_f64(v)?;
        let whole = curried_f64(args, 0).ok_or_else(|| missing_arg("pct", "whole"))?;
        Ok(if whole == 0.0 { Value::Null } else { Value::Float(a / whole * 100.0) })
    });

    reg!("max", |v: &Value, args, _| reduce_list(v, args, |a, b| a.max(b)));
    reg!("min", |v: &Value, args, _| reduce_list(v, args, |a, b| a.min(b)));
    reg!("sum", |v: &Value, _, _| reduce_list_values(v, 0.0, |a, b| a + b).map(sum_to_value));
    reg!("avg", |v: &Value, _, _| {
        let items = require_list(v)?;
        if items.is_empty() {
            return Ok(Value::Null);
        }
        let total: f64 = items.iter().filter_map(Value::as_f64).sum();
        Ok(Value::Float(total / items.len() as f64))
    });
    reg!("len", |v: &Value, _, _| {
        Ok(Value::Integer(match v {
            Value::List(l) => l.len() as i64,
            Value::Map(m) => m.len() as i64,
            Value::String(s) => s.chars().count() as i64,
            _ => return Err(Error::operator(format!("`len` is not defined for {}", v.type_name()))),
        }))
    });
    reg!("is_empty", |v: &Value, _, _| Ok(Value::Bool(is_empty(v))));
    reg!("non_empty", |v: &Value, _, _| Ok(Value::Bool(!is_empty(v))));
    reg!("first", |v: &Value, _, _| Ok(require_list(v)?.first().cloned().unwrap_or(Value::Null)));
    reg!("last", |v: &Value, _, _| Ok(require_list(v)?.last().cloned().unwrap_or(Value::Null)));
    reg!("unique", |v: &Value, _, _| {
        let items = require_list(v)?;
        let mut seen: Vec<Value> = Vec::new();
        for item in items {
            if !seen.contains(item) {
                seen.push(item.clone());
            }
        }
        Ok(Value::List(seen))
    });
    reg!("sorted", |v: &Value, args, kwargs| {
        let mut items = require_list(v)?.clone();
        items.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let reverse = curried_bool(args, kwargs, "reverse", 0).unwrap_or(false);
        if reverse {
            items.reverse();
        }
        Ok(Value::List(items))
    });
    reg!("contains", |v: &Value, args: &[Literal], _: &HashMap<String, Literal>| {
        let needle = args.first().ok_or_else(|| missing_arg("contains", "needle"))?.clone().into_value();
        Ok(Value::Bool(match v {
            Value::List(l) => l.contains(&needle),
            Value::String(s) => matches!(&needle, Value::String(n) if s.contains(n.as_str())),
            Value::Map(m) => matches!(&needle, Value::String(k) if m.contains_key(k)),
            _ => false,
        }))
    });
    reg!("in", |v: &Value, args: &[Literal], _: &HashMap<String, Literal>| {
        let haystack = args.first().ok_or_else(|| missing_arg("in", "haystack"))?.clone().into_value();
        Ok(Value::Bool(match haystack {
            Value::List(l) => l.contains(v),
            _ => false,
        }))
    });

    reg!("pick", |v: &Value, args: &[Literal], _: &HashMap<String, Literal>| {
        let m = require_map(v)?;
        let mut out = crate::value::Map::new();
        for key in args {
            if let Some(k) = key.as_str() {
                if let Some(val) = m.get(k) {
                    out.insert(k.to_string(), val.clone());
                }
            }
        }
        Ok(Value::Map(out))
    });
    reg!("unpick", |v: &Value, args: &[Literal], _: &HashMap<String, Literal>| {
        let m = require_map(v)?;
        let drop: Vec<&str> = args.iter().filter_map(Literal::as_str).collect();
        let mut out = crate::value::Map::new();
        for (k, val) in m {
            if !drop.contains(&k.as_str()) {
                out.insert(k.clone(), val.clone());
            }
        }
        Ok(Value::Map(out))
    });

    reg!("lower", |v: &Value, _, _| Ok(Value::String(require_str(v)?.to_lowercase())));
    reg!("upper", |v: &Value, _, _| Ok(Value::String(require_str(v)?.to_uppercase())));
    reg!("title", |v: &Value, _, _| Ok(Value::String(title_case(require_str(v)?))));
    reg!("strip", |v: &Value, _, _| Ok(Value::String(require_str(v)?.trim().to_string())));
    reg!("replace", |v: &Value, args, _| {
        let from = curried_str(args, 0).ok_or_else(|| missing_arg("replace", "from"))?;
        let to = curried_str(args, 1).ok_or_else(|| missing_arg("replace", "to"))?;
        Ok(Value::String(require_str(v)?.replace(from, to)))
    });
    reg!("split", |v: &Value, args, _| {
        let sep = curried_str(args, 0).unwrap_or(" ");
        Ok(Value::List(require_str(v)?.split(sep).map(Value::from).collect()))
    });
    reg!("join", |v: &Value, args, _| {
        let sep = curried_str(args, 0).unwrap_or("");
        let items = require_list(v)?;
        Ok(Value::String(items.iter().map(Value::to_string).collect::<Vec<_>>().join(sep)))
    });
    reg!("startswith", |v: &Value, args, _| {
        let prefix = curried_str(args, 0).ok_or_else(|| missing_arg("startswith", "prefix"))?;
        Ok(Value::Bool(require_str(v)?.starts_with(prefix)))
    });
    reg!("endswith", |v: &Value, args, _| {
        let suffix = curried_str(args, 0).ok_or_else(|| missing_arg("endswith", "suffix"))?;
        Ok(Value::Bool(require_str(v)?.ends_with(suffix)))
    });
    reg!("matches", |v: &Value, args, _| {
        let pattern = curried_str(args, 0).ok_or_else(|| missing_arg("matches", "pattern"))?;
        let re = regex::Regex::new(pattern).map_err(|e| Error::operator(format!("invalid regex `{pattern}`: {e}")))?;
        Ok(Value::Bool(re.is_match(require_str(v)?)))
    });

    reg!("default", |v: &Value, args: &[Literal], _: &HashMap<String, Literal>| {
        if matches!(v, Value::Null) {
            Ok(args.first().cloned().map(Literal::into_value).unwrap_or(Value::Null))
        } else {
            Ok(v.clone())
        }
    });
    reg!("coalesce", |v: &Value, args: &[Literal], _: &HashMap<String, Literal>| {
        if !matches!(v, Value::Null) {
            return Ok(v.clone());
        }
        for a in args {
            let candidate = a.clone().into_value();
            if !matches!(candidate, Value::Null) {
                return Ok(candidate);
            }
        }
        Ok(Value::Null)
    });
    reg!("type_is", |v: &Value, args, _| {
        let want = curried_str(args, 0).ok_or_else(|| missing_arg("type_is", "type"))?;
        Ok(Value::Bool(v.type_name() == want))
    });

    reg!("to_datetime", |v: &Value, args, _| {
        let fmt = curried_str(args, 0);
        Ok(super::temporal::to_epoch(v, fmt)?.map(Value::Integer).unwrap_or(Value::Null))
    });
    reg!("timestamp", |v: &Value, _, _| {
        Ok(super::temporal::to_epoch(v, None)?.map(Value::Integer).unwrap_or(Value::Null))
    });
    reg!("age_seconds", |v: &Value, _, _| {
        Ok(match super::temporal::to_epoch(v, None)? {
            Some(epoch) => Value::Integer(super::temporal::now_epoch() - epoch),
            None => Value::Null,
        })
    });
    reg!("before", |v: &Value, args, _| {
        let other = curried_str(args, 0).ok_or_else(|| missing_arg("before", "other"))?;
        super::temporal::compare(v, other, |a, b| a < b)
    });
    reg!("after", |v: &Value, args, _| {
        let other = curried_str(args, 0).ok_or_else(|| missing_arg("after", "other"))?;
        super::temporal::compare(v, other, |a, b| a > b)
    });

    reg!("median", |v: &Value, _, _| percentile(v, 50.0));
    reg!("q1", |v: &Value, _, _| percentile(v, 25.0));
    reg!("q3", |v: &Value, _, _| percentile(v, 75.0));
    reg!("iqr", |v: &Value, _, _| {
        let q1 = percentile(v, 25.0)?.as_f64();
        let q3 = percentile(v, 75.0)?.as_f64();
        Ok(match (q1, q3) {
            (Some(a), Some(b)) => Value::Float(b - a),
            _ => Value::Null,
        })
    });
    reg!("pctile", |v: &Value, args, _| {
        let p = curried_f64(args, 0).ok_or_else(|| missing_arg("pctile", "percentile"))?;
        percentile(v, p)
    });
    reg!("mode", |v: &Value, _, _| {
        let items = require_list(v)?;
        let mut counts: Vec<(Value, usize)> = Vec::new();
        for item in items {
            match counts.iter_mut().find(|(val, _)| val == item) {
                Some((_, c)) => *c += 1,
                None => counts.push((item.clone(), 1)),
            }
        }
        Ok(counts.into_iter().max_by_key(|(_, c)| *c).map(|(v, _)| v).unwrap_or(Value::Null))
    });
    reg!("stdev", |v: &Value, _, _| {
        let items = require_list(v)?;
        let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
        if nums.is_empty() {
            return Ok(Value::Null);
        }
        let mean = nums.iter().sum::<f64>() / nums.len() as f64;
        let variance = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / nums.len() as f64;
        Ok(Value::Float(variance.sqrt()))
    });
}

// Helpers

fn missing_arg(filter: &str, what: &str) -> Error {
    Error::operator(format!("`{filter}` requires a curried `{what}` argument"))
}

fn numeric_unary(v: &Value, f: impl Fn(f64) -> f64) -> Result<Value> {
    let x = require_f64(v)?;
    Ok(match v {
        Value::Integer(_) => {
            let r = f(x);
            if r.fract() == 0.0 { Value::Integer(r as i64) } else { Value::Float(r) }
        }
        _ => Value::Float(f(x)),
    })
}

fn require_f64(v: &Value) -> Result<f64> {
    v.as_f64().ok_or_else(|| Error::operator(format!("expected a number, got {}", v.type_name())))
}

fn require_i64(v: &Value) -> Result<i64> {
    v.as_i64().ok_or_else(|| Error::operator(format!("expected an integer, got {}", v.type_name())))
}

fn require_str(v: &Value) -> Result<&str> {
    match v {
        Value::String(s) => Ok(s),
        _ => Err(Error::operator(format!("expected a string, got {}", v.type_name()))),
    }
}

fn require_list(v: &Value) -> Result<&Vec<Value>> {
    v.as_list().ok_or_else(|| Error::operator(format!("expected a list, got {}", v.type_name())))
}

fn require_map(v: &Value) -> Result<&crate::value::Map> {
    v.as_map().ok_or_else(|| Error::operator(format!("expected a map, got {}", v.type_name())))
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::List(l) => l.is_empty(),
        Value::Map(m) => m.is_empty(),
        _ => false,
    }
}

fn curried_f64(args: &[Literal], idx: usize) -> Option<f64> {
    args.get(idx).and_then(|l| match l {
        Literal::Integer(i) => Some(*i as f64),
        Literal::Float(f) => Some(*f),
        _ => None,
    })
}

fn curried_i64(args: &[Literal], idx: usize) -> Option<i64> {
    args.get(idx).and_then(Literal::as_i64)
}

fn curried_str(args: &[Literal], idx: usize) -> Option<&str> {
    args.get(idx).and_then(Literal::as_str)
}

fn curried_bool(args: &[Literal], kwargs: &HashMap<String, Literal>, key: &str, idx: usize) -> Option<bool> {
    kwargs.get(key).and_then(Literal::as_bool).or_else(|| args.get(idx).and_then(Literal::as_bool))
}

fn compare_curried(v: &Value, args: &[Literal], cmp: impl Fn(f64, f64) -> bool) -> Result<Value> {
    let a = require_f64(v)?;
    let b = curried_f64(args, 0).ok_or_else(|| missing_arg("comparison", "operand"))?;
    Ok(Value::Bool(cmp(a, b)))
}

fn binary_curried(v: &Value, args: &[Literal], op: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let a = require_f64(v)?;
    let b = curried_f64(args, 0).ok_or_else(|| missing_arg("arithmetic", "operand"))?;
    let r = op(a, b);
    Ok(match v {
        Value::Integer(_) if r.fract() == 0.0 => Value::Integer(r as i64),
        _ => Value::Float(r),
    })
}

fn reduce_list(v: &Value, args: &[Literal], f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    if let Value::List(items) = v {
        let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
        return Ok(nums.into_iter().reduce(f).map(Value::Float).unwrap_or(Value::Null));
    }
    let a = require_f64(v)?;
    let b = curried_f64(args, 0).ok_or_else(|| missing_arg("max/min", "operand"))?;
    Ok(Value::Float(f(a, b)))
}

fn reduce_list_values(v: &Value, init: f64, f: impl Fn(f64, f64) -> f64) -> Result<f64> {
    let items = require_list(v)?;
    Ok(items.iter().filter_map(Value::as_f64).fold(init, f))
}

fn sum_to_value(total: f64) -> Value {
    if total.fract() == 0.0 { Value::Integer(total as i64) } else { Value::Float(total) }
}

fn round_to(x: f64, ndigits: usize) -> f64 {
    let factor = 10f64.powi(ndigits as i32);
    (x * factor).round() / factor
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn percentile(v: &Value, p: f64) -> Result<Value> {
    let items = require_list(v)?;
    let mut nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p / 100.0) * (nums.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(Value::Float(nums[lo]));
    }
    let frac = rank - lo as f64;
    Ok(Value::Float(nums[lo] + (nums[hi] - nums[lo]) * frac))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn reg() -> FilterRegistry {
        FilterRegistry::new()
    }

    fn call(name: &str, v: Value, args: Vec<Literal>) -> Value {
        let r = reg();
        let f = r.get(name).unwrap();
        f(&v, &args, &HashMap::new()).unwrap()
    }

    #[test]
    fn double_and_add_and_pow_compose_like_scenario_two() {
        // (2*(id_offset))^2 where offset = id + 2, matches spec scenario 2 shape.
        let v = call("add", Value::Integer(4), vec![Literal::Integer(2)]);
        let v = call("double", v, vec![]);
        let v = call("pow", v, vec![Literal::Integer(2)]);
        assert_eq!(v, Value::Float(144.0));
    }

    #[test]
    fn div_by_zero_yields_null() {
        assert_eq!(call("div", Value::Integer(4), vec![Literal::Integer(0)]), Value::Null);
    }

    #[test]
    fn sqrt_of_negative_yields_null() {
        assert_eq!(call("sqrt", Value::Integer(-4), vec![]), Value::Null);
    }

    #[test]
    fn even_and_odd() {
        assert_eq!(call("even", Value::Integer(4), vec![]), Value::Bool(true));
        assert_eq!(call("odd", Value::Integer(4), vec![]), Value::Bool(false));
    }

    #[test]
    fn sum_over_list() {
        let v = Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(call("sum", v, vec![]), Value::Integer(6));
    }

    #[test]
    fn sorted_reverse() {
        let v = Value::List(vec![Value::Integer(3), Value::Integer(1), Value::Integer(2)]);
        let out = call("sorted", v, vec![Literal::Bool(true)]);
        assert_eq!(out, Value::List(vec![Value::Integer(3), Value::Integer(2), Value::Integer(1)]));
    }

    #[test]
    fn matches_regex() {
        assert_eq!(call("matches", Value::String("hello123".into()), vec![Literal::String("^hello\\d+$".into())]), Value::Bool(true));
    }

    #[test]
    fn pick_and_unpick() {
        let mut m = crate::value::Map::new();
        m.insert("a".into(), Value::Integer(1));
        m.insert("b".into(), Value::Integer(2));
        let picked = call("pick", Value::Map(m.clone()), vec![Literal::String("a".into())]);
        assert_eq!(picked, Value::Map({
            let mut o = crate::value::Map::new();
            o.insert("a".into(), Value::Integer(1));
            o
        }));
        let unpicked = call("unpick", Value::Map(m), vec![Literal::String("a".into())]);
        assert_eq!(unpicked, Value::Map({
            let mut o = crate::value::Map::new();
            o.insert("b".into(), Value::Integer(2));
            o
        }));
    }

    #[test]
    fn median_of_odd_length_list() {
        let v = Value::List(vec![Value::Integer(1), Value::Integer(3), Value::Integer(2)]);
        assert_eq!(call("median", v, vec![]), Value::Float(2.0));
    }
}
