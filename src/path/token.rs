//! Classifies a raw token string into a [`PathToken`] variant.
//!
//! Rules are tried in order: `$$root`, `*`, `**`, a trailing `[]` (list
//! map), `key[index]`, `key[start:end]`, `key[?predicate]`, otherwise a
//! plain key-get.

use crate::error::{Error, Result};

use super::predicate::{parse_predicate, PredicateExpr};

/// The key a list-shaped operator (`ListMap`, `Index`, `Slice`,
/// `Predicate`) acts on: either a named map key, or the cursor itself (the
/// root-list write shortcut, `.`/`$$root` immediately followed by `[...]`).
#[derive(Debug, Clone, PartialEq)]
pub enum ListTarget {
    Key(String),
    SelfRoot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathToken {
    KeyGet(String),
    ListMap(ListTarget),
    Index(ListTarget, i64),
    Slice(ListTarget, Option<i64>, Option<i64>),
    Predicate(ListTarget, PredicateExpr),
    Wildcard,
    DeepWildcard,
    Root,
}

pub fn parse_token(path: &str, raw: &str) -> Result<PathToken> {
    if raw == "$$root" {
        return Ok(PathToken::Root);
    }
    if raw == "*" {
        return Ok(PathToken::Wildcard);
    }
    if raw == "**" {
        return Ok(PathToken::DeepWildcard);
    }

    let (key_text, bracket) = split_key_and_bracket(raw);

    let Some(bracket) = bracket else {
        return Ok(PathToken::KeyGet(raw.to_string()));
    };

    let target = if key_text == "." || key_text == "$$root" {
        ListTarget::SelfRoot
    } else {
        ListTarget::Key(key_text.to_string())
    };

    if bracket.is_empty() {
        return Ok(PathToken::ListMap(target));
    }

    if let Some(rest) = bracket.strip_prefix('?') {
        let expr = parse_predicate(path, rest)?;
        return Ok(PathToken::Predicate(target, expr));
    }

    if let Some(colon) = find_top_level_colon(bracket) {
        let start = parse_opt_int(path, &bracket[..colon])?;
        let end = parse_opt_int(path, &bracket[colon + 1..])?;
        return Ok(PathToken::Slice(target, start, end));
    }

    let idx: i64 = bracket
        .parse()
        .map_err(|_| Error::parse(path, Some(raw.to_string()), format!("`{bracket}` is not a valid index")))?;
    Ok(PathToken::Index(target, idx))
}

/// Splits `raw` into `(key, Some(bracket_contents))` if it ends with a
/// single balanced `[...]` group, or `(raw, None)` otherwise (a plain
/// key-get, including a trailing `[]` list-map which is handled by its own
/// variant below since `ListMap`'s bracket is empty).
fn split_key_and_bracket(raw: &str) -> (&str, Option<&str>) {
    if !raw.ends_with(']') {
        return (raw, None);
    }
    let bytes = raw.as_bytes();
    let in_quotes = quoted_positions(bytes);
    let mut depth = 0i32;
    let mut open = None;
    for i in (0..bytes.len()).rev() {
        if in_quotes[i] {
            continue;
        }
        match bytes[i] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    open = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    match open {
        Some(open) => {
            let key = &raw[..open];
            let inner = &raw[open + 1..raw.len() - 1];
            (key, Some(inner))
        }
        None => (raw, None),
    }
}

/// Marks, for each byte index, whether it falls inside a `'...'`/`"..."`
/// quoted span (the quote delimiters themselves count as inside).
fn quoted_positions(bytes: &[u8]) -> Vec<bool> {
    let mut marks = vec![false; bytes.len()];
    let mut quote: Option<u8> = None;
    for (i, &c) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            marks[i] = true;
            if c == q {
                quote = None;
            }
            continue;
        }
        if c == b'\'' || c == b'"' {
            quote = Some(c);
            marks[i] = true;
        }
    }
    marks
}

fn find_top_level_colon(text: &str) -> Option<usize> {
    // Slices never nest brackets, so a plain scan suffices.
    text.find(':')
}

fn parse_opt_int(path: &str, text: &str) -> Result<Option<i64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::parse(path, Some(text.to_string()), format!("`{text}` is not a valid slice bound")))
}
