//! The dynamic value tree that DictWalk paths are evaluated against.
//!
//! A [`Value`] is a tagged variant over the scalar/container shapes the path
//! language understands: null, bool, integer, float, string, ordered list,
//! and an insertion-ordered string-keyed map. Hosts whose native dynamic type
//! already matches this shape can convert at the ingress/egress boundary;
//! everything in the evaluator dispatches on this enum directly.

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;

/// An insertion-ordered string-keyed map, the `Map` variant's backing store.
pub type Map = IndexMap<String, Value>;

/// A dynamically typed node in the tree DictWalk paths traverse.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Truthiness used by predicate/filter boolean composition.
    ///
    /// Null, `false`, zero, empty string, and empty containers are falsy;
    /// everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    /// Immediate children in iteration order, used by `Wildcard`.
    pub fn children(&self) -> Vec<Value> {
        match self {
            Value::List(l) => l.clone(),
            Value::Map(m) => m.values().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// All transitive descendants in pre-order, used by `DeepWildcard`.
    pub fn descendants(&self) -> Vec<Value> {
        let mut out = Vec::new();
        Self::collect_descendants(self, &mut out);
        out
    }

    fn collect_descendants(value: &Value, out: &mut Vec<Value>) {
        match value {
            Value::List(l) => {
                for item in l {
                    out.push(item.clone());
                    Self::collect_descendants(item, out);
                }
            }
            Value::Map(m) => {
                for item in m.values() {
                    out.push(item.clone());
                    Self::collect_descendants(item, out);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Ordering between two values of possibly different leaf types.
///
/// Cross-type ordering is undefined per the value model; this returns `None`
/// in that case so callers (predicate comparison) can fall back to their own
/// coercion strategy rather than panicking.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_natural_semantics() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Integer(1).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn cross_type_ordering_is_undefined() {
        assert_eq!(Value::Integer(1).partial_cmp(&Value::String("1".into())), None);
    }

    #[test]
    fn integer_float_ordering_coerces() {
        assert_eq!(Value::Integer(2).partial_cmp(&Value::Float(1.5)), Some(Ordering::Greater));
    }

    #[test]
    fn maps_preserve_insertion_order() {
        let mut m = Map::new();
        m.insert("b".to_string(), Value::Integer(1));
        m.insert("a".to_string(), Value::Integer(2));
        let keys: Vec<_> = m.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }
}
