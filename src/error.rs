//! Error taxonomy for path parsing and evaluation.
//!
//! Mirrors the operation boundary the evaluator raises across: malformed
//! paths fail during tokenizing/parsing (`Parse`), strict-mode resolution
//! failures carry the offending token (`Resolution`), bad operator/value
//! combinations are `Operator`, and operations refused by a frozen registry
//! fall under `Forbidden`.

/// Result type returned by every DictWalk operation.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A path string (or an embedded predicate/filter segment) could not be
    /// parsed: malformed token, illegal `$$root` value form, a `Root` token
    /// in a write/unset path, legacy `?$name...` predicate syntax, or
    /// `run_filter_function` called on a non-`$`-prefixed string.
    #[error("parse error in `{path}`{}: {message}", token_suffix(token))]
    Parse {
        path: String,
        token: Option<String>,
        message: String,
    },

    /// Strict-mode resolution failed: missing key, type mismatch, or
    /// out-of-range index/slice encountered while walking a token.
    #[error("resolution error in `{path}` at token `{token}`: {message}")]
    Resolution {
        path: String,
        token: String,
        message: String,
    },

    /// An operator/value combination has no defined semantics, e.g. an
    /// ordered comparison operator paired with a filter-pipeline rhs.
    #[error("operator error: {message}")]
    Operator { message: String },

    /// The operation is refused by this evaluator instance, e.g.
    /// `register_path_filter` against the frozen default evaluator.
    #[error("operation forbidden: {message}")]
    Forbidden { message: String },
}

fn token_suffix(token: &Option<String>) -> String {
    match token {
        Some(t) => format!(" at token `{t}`"),
        None => String::new(),
    }
}

impl Error {
    pub fn parse(path: impl Into<String>, token: Option<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            token,
            message: message.into(),
        }
    }

    pub fn resolution(path: impl Into<String>, token: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Resolution {
            path: path.into(),
            token: token.into(),
            message: message.into(),
        }
    }

    pub fn operator(message: impl Into<String>) -> Self {
        Error::Operator {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::Forbidden {
            message: message.into(),
        }
    }

    /// True for the error kinds that a non-strict `get`/`exists` catches
    /// internally instead of propagating.
    pub fn is_non_strict_swallowable(&self) -> bool {
        matches!(self, Error::Resolution { .. } | Error::Operator { .. })
    }
}
