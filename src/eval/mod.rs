//! The evaluator: three walks (resolve, write, unset) over a token list,
//! each dispatching per [`crate::path::PathToken`] variant and consulting
//! the filter registry whenever `$…` appears.

pub mod options;
pub mod predicate_eval;
pub mod resolve;
pub mod set;
pub mod unset;

pub use options::WriteOptions;

use crate::path::{ListTarget, PathToken};

/// The traversal cursor: either a single resolved node, or a list of nodes
/// produced by a fan-out token (`ListMap`, `Wildcard`, `DeepWildcard`,
/// `Predicate`). `Slice` and `Index` never fan out — see the GLOSSARY's
/// fan-out definition, which omits `Slice`.
#[derive(Debug, Clone)]
pub enum Cursor {
    One(crate::value::Value),
    Many(Vec<crate::value::Value>),
}

impl Cursor {
    /// Collapses to a single value: `Many` becomes a `List`. Used when an
    /// output transform or a caller expects one value back.
    pub fn into_value(self) -> crate::value::Value {
        match self {
            Cursor::One(v) => v,
            Cursor::Many(items) => crate::value::Value::List(items),
        }
    }
}

/// A human-readable label for the offending token, used as error context.
/// Paths don't retain each token's original substring past classification,
/// so this reconstructs an equivalent description rather than the exact
/// raw text.
pub fn describe_token(tok: &PathToken) -> String {
    match tok {
        PathToken::KeyGet(k) => k.clone(),
        PathToken::ListMap(t) => format!("{}[]", describe_target(t)),
        PathToken::Index(t, i) => format!("{}[{i}]", describe_target(t)),
        PathToken::Slice(t, s, e) => format!(
            "{}[{}:{}]",
            describe_target(t),
            s.map(|v| v.to_string()).unwrap_or_default(),
            e.map(|v| v.to_string()).unwrap_or_default()
        ),
        PathToken::Predicate(t, _) => format!("{}[?…]", describe_target(t)),
        PathToken::Wildcard => "*".to_string(),
        PathToken::DeepWildcard => "**".to_string(),
        PathToken::Root => "$$root".to_string(),
    }
}

fn describe_target(t: &ListTarget) -> String {
    match t {
        ListTarget::Key(k) => k.clone(),
        ListTarget::SelfRoot => ".".to_string(),
    }
}
