//! The filter registry: a mapping from name to [`FilterFn`].
//!
//! A default set of filters is pre-registered by [`FilterRegistry::default`].
//! The registry backing the crate's default [`crate::Evaluator`] is frozen:
//! `register` refuses further registrations so that `$name` always means
//! the same thing for every caller of the shared instance. A
//! [`FilterRegistry::new`] (unfrozen) registry is available for hosts that
//! need custom filters.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::path::literal::Literal;
use crate::value::Value;

/// A registered filter's callable: value, curried positional args, curried
/// keyword args -> result.
pub type FilterFn = Arc<dyn Fn(&Value, &[Literal], &HashMap<String, Literal>) -> Result<Value> + Send + Sync>;

/// Name -> callable table behind a [`RwLock`] so that `register`/`get` only
/// need `&self` — the shared, `'static` default evaluator hands out shared
/// references, and registration against it must still type-check (it just
/// fails at the frozen check, not at the borrow checker).
pub struct FilterRegistry {
    entries: RwLock<HashMap<String, FilterFn>>,
    frozen: bool,
}

impl FilterRegistry {
    /// An empty, mutable registry (no built-ins pre-registered).
    pub fn empty() -> Self {
        FilterRegistry {
            entries: RwLock::new(HashMap::new()),
            frozen: false,
        }
    }

    /// A mutable registry with the default filter catalogue pre-registered.
    pub fn new() -> Self {
        let reg = Self::empty();
        super::builtins::register_all(&reg);
        reg
    }

    /// A registry with the default catalogue, frozen against further
    /// registration. Used by the crate's shared default evaluator.
    pub(crate) fn frozen_default() -> Self {
        let mut reg = Self::new();
        reg.frozen = true;
        reg
    }

    pub fn register(&self, name: impl Into<String>, f: FilterFn) -> Result<()> {
        let name = name.into();
        if self.frozen {
            return Err(Error::forbidden("cannot register a filter on a frozen evaluator instance"));
        }
        tracing::debug!(name = %name, "registering custom path filter");
        self.entries.write().expect("filter registry lock poisoned").insert(name, f);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<FilterFn> {
        self.entries
            .read()
            .expect("filter registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| Error::parse("", Some(name.to_string()), format!("no such filter function: `{name}`")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().expect("filter registry lock poisoned").contains_key(name)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Clone for FilterRegistry {
    fn clone(&self) -> Self {
        let entries = self.entries.read().expect("filter registry lock poisoned").clone();
        FilterRegistry {
            entries: RwLock::new(entries),
            frozen: self.frozen,
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_registry_refuses_registration() {
        let reg = FilterRegistry::frozen_default();
        let result = reg.register("custom", Arc::new(|v: &Value, _, _| Ok(v.clone())));
        assert!(matches!(result, Err(Error::Forbidden { .. })));
    }

    #[test]
    fn unfrozen_registry_accepts_registration() {
        let reg = FilterRegistry::new();
        reg.register("custom", Arc::new(|v: &Value, _, _| Ok(v.clone()))).unwrap();
        assert!(reg.contains("custom"));
    }

    #[test]
    fn unknown_filter_is_parse_error() {
        let reg = FilterRegistry::new();
        assert!(reg.get("nope").is_err());
    }
}
