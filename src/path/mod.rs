//! The path expression language: tokenizer, token classifier, and predicate
//! grammar.
//!
//! A path string is first split into an optional trailing output-transform
//! pipeline (`tokenizer::split_output_transform`), then the remaining base
//! path is split into raw dot-separated tokens respecting bracket nesting
//! (`tokenizer::split_tokens`), and each raw token is classified into a
//! [`PathToken`] (`token::parse_token`).

pub mod literal;
pub mod predicate;
pub mod token;
pub mod tokenizer;

pub use literal::Literal;
pub use predicate::{BoolExpr, CompareOp, Lhs, PredicateExpr, Rhs};
pub use token::{ListTarget, PathToken};

use crate::error::{Error, Result};

/// A fully parsed path: the token sequence plus an optional output
/// transform pipeline string (reads only).
#[derive(Debug, Clone)]
pub struct ParsedPath {
    pub tokens: Vec<PathToken>,
    pub transform: Option<String>,
    /// True when the path used the root-list shortcut (a leading `.` or
    /// `$$root` immediately followed by `[...]`), the only form in which a
    /// root-anchored list operator is legal in a write/unset path.
    pub root_list_shortcut: bool,
}

/// Parses `path` for a read operation (`get`/`exists`). The output
/// transform suffix, if present, is split off and returned separately.
pub fn parse_for_read(path: &str) -> Result<ParsedPath> {
    parse(path, false)
}

/// Parses `path` for a write/unset operation. A bare `Root` token
/// (`$$root` used as a standalone path segment, not as the root-list
/// shortcut) is rejected here per the write-path parse gate.
pub fn parse_for_write(path: &str) -> Result<ParsedPath> {
    let parsed = parse(path, true)?;
    if parsed.tokens.iter().any(|t| matches!(t, PathToken::Root)) && !parsed.root_list_shortcut {
        return Err(Error::parse(
            path,
            Some("$$root".to_string()),
            "`$$root` cannot appear as a token in a write/unset path (only the root-list shortcut is permitted)",
        ));
    }
    Ok(parsed)
}

fn parse(path: &str, for_write: bool) -> Result<ParsedPath> {
    if path.is_empty() {
        return Err(Error::parse(path, None, "path must not be empty"));
    }

    let (base, transform) = tokenizer::split_output_transform(path);
    if base == "." {
        return Ok(ParsedPath {
            tokens: Vec::new(),
            transform: transform.map(str::to_string),
            root_list_shortcut: false,
        });
    }
    let root_list_shortcut = for_write && tokenizer::is_root_list_shortcut(base);

    let raw_tokens = tokenizer::split_tokens(path, base)?;
    let mut tokens = Vec::with_capacity(raw_tokens.len());
    for raw in raw_tokens {
        tokens.push(token::parse_token(path, raw)?);
    }

    Ok(ParsedPath {
        tokens,
        transform: transform.map(str::to_string),
        root_list_shortcut,
    })
}
