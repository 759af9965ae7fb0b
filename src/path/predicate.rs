//! The predicate grammar: boolean composition (`&&`, `||`, `!`, grouping)
//! over filter-segment operands, plus the plain `lhs OP rhs` comparison
//! form.
//!
//! ```text
//! or   := and ('||' and)*
//! and  := not ('&&' not)*
//! not  := '!' not | primary
//! primary := '(' or ')' | operand
//! ```
//!
//! An operand is a filter segment (`$name`, `$name(args)`, `$name(args)[]`,
//! optionally piped) evaluated against the item the predicate is filtering.

use crate::error::{Error, Result};
use crate::filter::pipeline::FilterPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

/// The left-hand side of a `lhs OP rhs` comparison predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Lhs {
    /// A bare identifier: look up this key on the item.
    Key(String),
    /// `.`: the item itself.
    Itself,
    /// `.|$pipeline`: apply the pipeline to the item.
    Pipeline(FilterPipeline),
}

/// The right-hand side of a comparison predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    Literal(crate::path::literal::Literal),
    Pipeline(FilterPipeline),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateExpr {
    Compare {
        lhs: Lhs,
        op: CompareOp,
        rhs: Rhs,
        /// The untrimmed rhs source text. A predicate write that creates a
        /// missing match synthesizes `{lhs_key: rhs_raw}` from this literal
        /// *text*, not the parsed literal — `[?id==3]` creates `{"id": "3"}`,
        /// a string, not an integer.
        rhs_raw: String,
    },
    Bool(BoolExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    Operand(FilterPipeline),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

/// Parses a predicate body (the text inside `[?...]`).
pub fn parse_predicate(path: &str, body: &str) -> Result<PredicateExpr> {
    if has_boolean_tokens(body) {
        let toks = lex_bool(path, body)?;
        let mut pos = 0usize;
        let expr = parse_or(path, &toks, &mut pos)?;
        if pos != toks.len() {
            return Err(Error::parse(path, Some(body.to_string()), "unexpected trailing tokens in predicate"));
        }
        return Ok(PredicateExpr::Bool(expr));
    }
    if body.trim_start().starts_with('$') && find_operator(body).is_none() {
        // A bare filter with no boolean composition, e.g. `[?$even]`: the
        // parser produces the same operand callable directly.
        let pipeline = crate::filter::pipeline::parse_pipeline(path, body.trim())?;
        return Ok(PredicateExpr::Bool(BoolExpr::Operand(pipeline)));
    }
    parse_compare(path, body)
}

fn legacy_filter_lhs_error(path: &str, body: &str) -> Error {
    Error::parse(
        path,
        Some(body.to_string()),
        "left-hand side of a predicate cannot start with `$`; use `.|$name` to apply a filter to the item",
    )
}

// Comparison form: lhs OP rhs

fn parse_compare(path: &str, body: &str) -> Result<PredicateExpr> {
    let (op_pos, op, op_len) = find_operator(body)
        .ok_or_else(|| Error::parse(path, Some(body.to_string()), "predicate is missing a comparison operator"))?;
    let lhs_text = body[..op_pos].trim();
    let rhs_text = body[op_pos + op_len..].trim();

    let lhs = parse_lhs(path, lhs_text)?;
    let rhs = parse_rhs(path, rhs_text)?;
    if !matches!(op, CompareOp::Eq | CompareOp::Ne) {
        if let Rhs::Pipeline(_) = &rhs {
            return Err(Error::operator("ordered comparison operators cannot be paired with a filter-pipeline right-hand side"));
        }
    }
    Ok(PredicateExpr::Compare {
        lhs,
        op,
        rhs,
        rhs_raw: rhs_text.to_string(),
    })
}

fn parse_lhs(path: &str, text: &str) -> Result<Lhs> {
    if text == "." {
        return Ok(Lhs::Itself);
    }
    if let Some(rest) = text.strip_prefix(".|") {
        return Ok(Lhs::Pipeline(crate::filter::pipeline::parse_pipeline(path, rest)?));
    }
    if text.starts_with('$') {
        return Err(legacy_filter_lhs_error(path, text));
    }
    Ok(Lhs::Key(text.to_string()))
}

fn parse_rhs(path: &str, text: &str) -> Result<Rhs> {
    if text.starts_with('$') {
        return Ok(Rhs::Pipeline(crate::filter::pipeline::parse_pipeline(path, text)?));
    }
    Ok(Rhs::Literal(crate::path::literal::parse_literal(path, text)?))
}

/// Finds the leftmost comparison operator at bracket/quote depth zero.
/// Prefers the two-character operators over the single-character ones at
/// the same position.
fn find_operator(body: &str) -> Option<(usize, CompareOp, usize)> {
    let bytes = body.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' | b'"' => quote = Some(c),
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            _ if depth == 0 => {
                let two = bytes.get(i..i + 2);
                match two {
                    Some(b"==") => return Some((i, CompareOp::Eq, 2)),
                    Some(b"!=") => return Some((i, CompareOp::Ne, 2)),
                    Some(b">=") => return Some((i, CompareOp::Ge, 2)),
                    Some(b"<=") => return Some((i, CompareOp::Le, 2)),
                    _ => {
                        if c == b'>' {
                            return Some((i, CompareOp::Gt, 1));
                        }
                        if c == b'<' {
                            return Some((i, CompareOp::Lt, 1));
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// Boolean form

#[derive(Debug, Clone, PartialEq)]
enum BTok {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Operand(String),
}

fn has_boolean_tokens(body: &str) -> bool {
    matches!(lex_bool("", body), Ok(toks) if toks.iter().any(|t| matches!(t, BTok::And | BTok::Or | BTok::Not)))
}

fn lex_bool(path: &str, body: &str) -> Result<Vec<BTok>> {
    let bytes = body.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if bytes.get(i..i + 2) == Some(b"&&") {
            toks.push(BTok::And);
            i += 2;
            continue;
        }
        if bytes.get(i..i + 2) == Some(b"||") {
            toks.push(BTok::Or);
            i += 2;
            continue;
        }
        if c == b'!' && bytes.get(i + 1) != Some(&b'=') {
            toks.push(BTok::Not);
            i += 1;
            continue;
        }
        if c == b'(' {
            toks.push(BTok::LParen);
            i += 1;
            continue;
        }
        if c == b')' {
            toks.push(BTok::RParen);
            i += 1;
            continue;
        }
        // Operand run: consume until a top-level (paren/quote depth zero)
        // delimiter. Parens/brackets opened within the operand (e.g. a
        // filter call's argument list) contribute to their own depth and
        // do not end the operand early.
        let start = i;
        let mut depth = 0i32;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let c = bytes[i];
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                b'\'' | b'"' => {
                    quote = Some(c);
                    i += 1;
                }
                b'(' | b'[' => {
                    depth += 1;
                    i += 1;
                }
                b')' | b']' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    i += 1;
                }
                _ if depth == 0
                    && (bytes.get(i..i + 2) == Some(b"&&")
                        || bytes.get(i..i + 2) == Some(b"||")
                        || (c == b'!' && bytes.get(i + 1) != Some(&b'='))
                        || c.is_ascii_whitespace()) =>
                {
                    break;
                }
                _ => i += 1,
            }
        }
        let operand = body[start..i].trim();
        if operand.is_empty() {
            return Err(Error::parse(path, Some(body.to_string()), "empty operand in predicate"));
        }
        toks.push(BTok::Operand(operand.to_string()));
    }
    Ok(toks)
}

fn parse_or(path: &str, toks: &[BTok], pos: &mut usize) -> Result<BoolExpr> {
    let mut lhs = parse_and(path, toks, pos)?;
    while matches!(toks.get(*pos), Some(BTok::Or)) {
        *pos += 1;
        let rhs = parse_and(path, toks, pos)?;
        lhs = BoolExpr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(path: &str, toks: &[BTok], pos: &mut usize) -> Result<BoolExpr> {
    let mut lhs = parse_not(path, toks, pos)?;
    while matches!(toks.get(*pos), Some(BTok::And)) {
        *pos += 1;
        let rhs = parse_not(path, toks, pos)?;
        lhs = BoolExpr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_not(path: &str, toks: &[BTok], pos: &mut usize) -> Result<BoolExpr> {
    if matches!(toks.get(*pos), Some(BTok::Not)) {
        *pos += 1;
        return Ok(BoolExpr::Not(Box::new(parse_not(path, toks, pos)?)));
    }
    parse_primary(path, toks, pos)
}

fn parse_primary(path: &str, toks: &[BTok], pos: &mut usize) -> Result<BoolExpr> {
    match toks.get(*pos) {
        Some(BTok::LParen) => {
            *pos += 1;
            let inner = parse_or(path, toks, pos)?;
            match toks.get(*pos) {
                Some(BTok::RParen) => {
                    *pos += 1;
                    Ok(inner)
                }
                _ => Err(Error::parse(path, None, "expected `)` in predicate")),
            }
        }
        Some(BTok::Operand(text)) => {
            let pipeline = crate::filter::pipeline::parse_pipeline(path, text)?;
            *pos += 1;
            Ok(BoolExpr::Operand(pipeline))
        }
        other => Err(Error::parse(path, None, format!("unexpected token in predicate: {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_form_splits_lhs_op_rhs() {
        let expr = parse_predicate("p", "id==$even").unwrap();
        match expr {
            PredicateExpr::Compare { lhs, op, rhs, .. } => {
                assert_eq!(lhs, Lhs::Key("id".into()));
                assert_eq!(op, CompareOp::Eq);
                assert!(matches!(rhs, Rhs::Pipeline(_)));
            }
            _ => panic!("expected compare form"),
        }
    }

    #[test]
    fn compare_with_literal_int_rhs() {
        let expr = parse_predicate("p", "id==1").unwrap();
        assert!(matches!(expr, PredicateExpr::Compare { rhs: Rhs::Literal(_), .. }));
    }

    #[test]
    fn ordered_operator_with_pipeline_rhs_is_operator_error() {
        let err = parse_predicate("p", "id>$even").unwrap_err();
        assert!(matches!(err, Error::Operator { .. }));
    }

    #[test]
    fn bare_dollar_lhs_is_parse_error() {
        let err = parse_predicate("p", "$even==1").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn boolean_composition_with_grouping_and_not() {
        let expr = parse_predicate("p", "!($gt(1) && $lt(10))").unwrap();
        assert!(matches!(expr, PredicateExpr::Bool(BoolExpr::Not(_))));
    }

    #[test]
    fn itself_lhs_form() {
        let expr = parse_predicate("p", ".==1").unwrap();
        assert!(matches!(expr, PredicateExpr::Compare { lhs: Lhs::Itself, .. }));
    }

    #[test]
    fn pipeline_lhs_form() {
        let expr = parse_predicate("p", ".|$double==4").unwrap();
        assert!(matches!(expr, PredicateExpr::Compare { lhs: Lhs::Pipeline(_), .. }));
    }

    #[test]
    fn not_equal_is_compare_form_not_boolean_not() {
        let expr = parse_predicate("p", "id!=2").unwrap();
        match expr {
            PredicateExpr::Compare { lhs, op, rhs, .. } => {
                assert_eq!(lhs, Lhs::Key("id".into()));
                assert_eq!(op, CompareOp::Ne);
                assert!(matches!(rhs, Rhs::Literal(_)));
            }
            _ => panic!("expected compare form, not a boolean composition"),
        }
    }

    #[test]
    fn boolean_not_is_still_recognized_alongside_not_equal_lookahead() {
        let expr = parse_predicate("p", "!$even").unwrap();
        assert!(matches!(expr, PredicateExpr::Bool(BoolExpr::Not(_))));
    }
}
