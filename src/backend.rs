//! Backend selection: validates the `DICTWALK_BACKEND` environment variable
//! or an explicit override against the set of backends this crate accepts.
//!
//! This crate only ever runs the native evaluator in this file — there is
//! no separate extension to load — but hosts embedding DictWalk alongside
//! the reference implementation still need the same validation rule so a
//! misconfigured environment fails the same way in both.

use crate::error::{Error, Result};

pub const BACKEND_ENV_VAR: &str = "DICTWALK_BACKEND";

const VALID_BACKENDS: &[&str] = &["rust", "auto"];

/// Resolves which backend a caller asked for, preferring `preference` over
/// the `DICTWALK_BACKEND` environment variable, defaulting to `"rust"`.
/// Returns an error for anything other than `"rust"`/`"auto"`.
pub fn resolve_backend(preference: Option<&str>) -> Result<&'static str> {
    let from_env = std::env::var(BACKEND_ENV_VAR).ok();
    let requested = preference.or(from_env.as_deref()).unwrap_or("rust").trim().to_lowercase();

    if !VALID_BACKENDS.contains(&requested.as_str()) {
        return Err(Error::operator(format!(
            "invalid backend '{requested}'. Expected one of: {}",
            VALID_BACKENDS.join(", ")
        )));
    }
    Ok("rust")
}
