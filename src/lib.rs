//! DictWalk - path-expression reads, writes, and removals over nested
//! dynamic trees.
//!
//! A path string such as `a.b[?id==$even].c[]|$double` selects, filters,
//! maps, and transforms nodes of a [`Value`] tree in a single expression.
//!
//! # Architecture
//!
//! The crate is organized around three layers:
//! - `path`: tokenizes a path string and parses it into a [`path::ParsedPath`]
//!   (token sequence, predicate grammar, output transform)
//! - `filter`: the named filter catalogue (`filter::builtins`), the
//!   [`filter::FilterRegistry`] that looks them up by name, and
//!   [`filter::FilterPipeline`] composition
//! - `eval`: the three walks over a token list — `eval::resolve` for
//!   `get`/`exists`, `eval::set` for writes, `eval::unset` for removals —
//!   each consulting the registry wherever `$…` appears
//!
//! [`Evaluator`] ties these together behind the four operations a caller
//! sees: `get`, `exists`, `set`, `unset`, plus the filter-registry escape
//! hatches `run_filter_function`, `register_path_filter`, `get_path_filter`.

pub mod backend;
pub mod error;
pub mod eval;
pub mod filter;
pub mod path;
pub mod value;

pub use backend::{resolve_backend, BACKEND_ENV_VAR};
pub use error::{Error, Result};
pub use eval::WriteOptions;
pub use filter::{FilterFn, FilterRegistry};
pub use value::{Map, Value};

use std::sync::OnceLock;

/// A DictWalk evaluator instance: a path-expression interpreter closed over
/// a [`FilterRegistry`]. The [`default`] evaluator's registry is frozen, so
/// `$name` means the same thing to every caller of the shared instance;
/// construct your own with [`Evaluator::new`] to register custom filters.
pub struct Evaluator {
    registry: FilterRegistry,
}

impl Evaluator {
    /// A fresh evaluator with the default filter catalogue, open to
    /// `register_path_filter`.
    pub fn new() -> Self {
        Evaluator {
            registry: FilterRegistry::new(),
        }
    }

    fn frozen() -> Self {
        Evaluator {
            registry: FilterRegistry::frozen_default(),
        }
    }

    /// Resolves `path` against `data`. Returns `default` (non-strict) or
    /// raises [`Error::Resolution`]/[`Error::Parse`] (strict) when the path
    /// does not resolve.
    pub fn get(&self, data: &Value, path: &str, default: Value, strict: bool) -> Result<Value> {
        let parsed = path::parse_for_read(path)?;
        match eval::resolve::resolve(data, &parsed, path, &self.registry) {
            Ok(v) => Ok(v),
            Err(e) if !strict && e.is_non_strict_swallowable() => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// True iff `path` resolves against `data`.
    pub fn exists(&self, data: &Value, path: &str, strict: bool) -> Result<bool> {
        let parsed = path::parse_for_read(path)?;
        match eval::resolve::resolve(data, &parsed, path, &self.registry) {
            Ok(_) => Ok(true),
            Err(e) if !strict && e.is_non_strict_swallowable() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Writes `value` at every location `path` targets in `data`, mutating
    /// in place, per `options`. Strict mode pre-resolves the token prefix
    /// and aborts before mutating on failure.
    pub fn set(&self, data: &mut Value, path: &str, value: Value, strict: bool, options: WriteOptions) -> Result<()> {
        let parsed = path::parse_for_write(path)?;
        eval::set::set(data, &parsed, path, value, options, &self.registry, strict)
    }

    /// Removes every location `path` targets in `data`, mutating in place.
    /// Strict mode pre-resolves the full token path and aborts before
    /// mutating on failure.
    pub fn unset(&self, data: &mut Value, path: &str, strict: bool) -> Result<()> {
        let parsed = path::parse_for_write(path)?;
        eval::unset::unset(data, &parsed, path, &self.registry, strict)
    }

    /// Runs a bare filter pipeline string (`$name(args)|$other`) against
    /// `value` directly, without a surrounding path. Rejects non-`$`
    /// strings as a parse error.
    pub fn run_filter_function(&self, pipeline: &str, value: &Value) -> Result<Value> {
        let parsed = filter::pipeline::parse_pipeline("", pipeline)?;
        parsed.apply(value, &self.registry)
    }

    /// Registers a custom filter under `name`. Refused by the frozen
    /// default evaluator.
    pub fn register_path_filter(&self, name: impl Into<String>, f: FilterFn) -> Result<()> {
        self.registry.register(name, f)
    }

    /// Looks up a registered filter by name. Refused by the frozen default
    /// evaluator, matching its refusal of `register_path_filter` (neither
    /// escape hatch is open against the shared instance).
    pub fn get_path_filter(&self, name: &str) -> Result<FilterFn> {
        if self.registry.is_frozen() {
            return Err(Error::forbidden("cannot look up a filter on a frozen evaluator instance"));
        }
        self.registry.get(name)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_EVALUATOR: OnceLock<Evaluator> = OnceLock::new();

/// The shared, frozen default evaluator. Both `register_path_filter` and
/// `get_path_filter` against it raise [`Error::Forbidden`] — the registry
/// escape hatches are closed entirely on the shared instance so every
/// caller of `default()` sees the same, fixed filter catalogue. Construct
/// an [`Evaluator::new`] for a mutable registry instead.
pub fn default() -> &'static Evaluator {
    DEFAULT_EVALUATOR.get_or_init(Evaluator::frozen)
}

/// Resolves `path` against `data` using the default evaluator.
pub fn get(data: &Value, path: &str, default_value: Value, strict: bool) -> Result<Value> {
    default().get(data, path, default_value, strict)
}

/// True iff `path` resolves against `data`, using the default evaluator.
pub fn exists(data: &Value, path: &str, strict: bool) -> Result<bool> {
    default().exists(data, path, strict)
}

/// Writes `value` at `path` in `data` using the default evaluator.
pub fn set(data: &mut Value, path: &str, value: Value, strict: bool, options: WriteOptions) -> Result<()> {
    default().set(data, path, value, strict, options)
}

/// Removes `path` from `data` using the default evaluator.
pub fn unset(data: &mut Value, path: &str, strict: bool) -> Result<()> {
    default().unset(data, path, strict)
}

/// Runs a bare filter pipeline against `value` using the default
/// evaluator.
pub fn run_filter_function(pipeline: &str, value: &Value) -> Result<Value> {
    default().run_filter_function(pipeline, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_evaluator_is_frozen() {
        let reg = default().registry.clone();
        let result = reg.register("custom", std::sync::Arc::new(|v: &Value, _, _| Ok(v.clone())));
        assert!(result.is_err());
    }

    #[test]
    fn module_level_get_delegates_to_default_evaluator() {
        let data: Value = serde_json::from_str(r#"{"a":{"b":1}}"#).unwrap();
        assert_eq!(get(&data, "a.b", Value::Null, false).unwrap(), Value::Integer(1));
    }

    #[test]
    fn custom_evaluator_accepts_registration() {
        let ev = Evaluator::new();
        ev.register_path_filter("triple", std::sync::Arc::new(|v: &Value, _, _| Ok(Value::Integer(v.as_i64().unwrap_or(0) * 3)))).unwrap();
        assert!(ev.get_path_filter("triple").is_ok());
    }

    #[test]
    fn set_then_get_round_trips_through_module_functions() {
        let mut data: Value = serde_json::from_str(r#"{}"#).unwrap();
        set(&mut data, "a.b", Value::Integer(7), false, WriteOptions::default()).unwrap();
        assert_eq!(get(&data, "a.b", Value::Null, false).unwrap(), Value::Integer(7));
        unset(&mut data, "a.b", false).unwrap();
        assert!(!exists(&data, "a.b", false).unwrap());
    }

    #[test]
    fn run_filter_function_applies_pipeline_to_bare_value() {
        assert_eq!(run_filter_function("$double", &Value::Integer(4)).unwrap(), Value::Integer(8));
    }
}
