//! Parses and applies filter pipelines: `$name(args)[]|$other(args)`.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::path::literal::{split_top_level, Literal};
use crate::value::Value;

use super::registry::FilterRegistry;

/// One `$name(args)[]` segment of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSegment {
    pub name: String,
    pub args: Vec<Literal>,
    pub kwargs: HashMap<String, Literal>,
    /// A trailing `[]`: map the filter over list items, apply directly to
    /// a scalar.
    pub map_over_list: bool,
}

/// A left-to-right composition of pipeline segments.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPipeline {
    pub segments: Vec<PipelineSegment>,
}

impl FilterPipeline {
    pub fn apply(&self, value: &Value, registry: &FilterRegistry) -> Result<Value> {
        let mut current = value.clone();
        for seg in &self.segments {
            current = seg.apply(&current, registry)?;
        }
        Ok(current)
    }
}

impl PipelineSegment {
    pub fn apply(&self, value: &Value, registry: &FilterRegistry) -> Result<Value> {
        let f = registry.get(&self.name)?;
        if self.map_over_list {
            match value {
                Value::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(f(item, &self.args, &self.kwargs)?);
                    }
                    Ok(Value::List(out))
                }
                scalar => f(scalar, &self.args, &self.kwargs),
            }
        } else {
            f(value, &self.args, &self.kwargs)
        }
    }
}

/// Parses `text` (e.g. `$double` or `$add(2)|$pow(2)[]`) into a pipeline.
pub fn parse_pipeline(path: &str, text: &str) -> Result<FilterPipeline> {
    let text = text.trim();
    if !text.starts_with('$') {
        return Err(Error::parse(path, Some(text.to_string()), "a filter pipeline must start with `$`"));
    }
    let mut segments = Vec::new();
    for part in split_top_level(text, '|') {
        segments.push(parse_segment(path, part.trim())?);
    }
    Ok(FilterPipeline { segments })
}

fn parse_segment(path: &str, text: &str) -> Result<PipelineSegment> {
    let text = text
        .strip_prefix('$')
        .ok_or_else(|| Error::parse(path, Some(text.to_string()), "filter segment must start with `$`"))?;

    let map_over_list = text.ends_with("[]");
    let text = if map_over_list { &text[..text.len() - 2] } else { text };

    let (name, args_text) = match text.find('(') {
        Some(open) => {
            let close = text.rfind(')').filter(|&c| c > open).ok_or_else(|| {
                Error::parse(path, Some(text.to_string()), "unterminated filter argument list")
            })?;
            if close != text.len() - 1 {
                return Err(Error::parse(path, Some(text.to_string()), "unexpected trailing input after filter call"));
            }
            (&text[..open], Some(&text[open + 1..close]))
        }
        None => (text, None),
    };

    let starts_ok = matches!(name.chars().next(), Some(c) if c.is_alphabetic() || c == '_');
    if !starts_ok || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(Error::parse(path, Some(name.to_string()), "invalid filter name"));
    }

    let mut args = Vec::new();
    let mut kwargs = HashMap::new();
    if let Some(args_text) = args_text {
        for part in split_top_level(args_text, ',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((key, value)) = split_kwarg(part) {
                kwargs.insert(key.trim().to_string(), crate::path::literal::parse_literal(path, value)?);
            } else {
                args.push(crate::path::literal::parse_literal(path, part)?);
            }
        }
    }
    Ok(PipelineSegment {
        name: name.to_string(),
        args,
        kwargs,
        map_over_list,
    })
}

/// Splits `ident=value` at the top-level `=`, distinct from `==` comparison
/// which never appears inside a filter argument.
fn split_kwarg(part: &str) -> Option<(&str, &str)> {
    let bytes = part.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b'=' {
            if bytes.get(i + 1) == Some(&b'=') || (i > 0 && bytes[i - 1] == b'=') {
                return None;
            }
            let key = &part[..i];
            if key.chars().all(|c| c.is_alphanumeric() || c == '_') && !key.is_empty() {
                return Some((key, &part[i + 1..]));
            }
        }
    }
    None
}

/// A parsed `$$root[.subpath][|$pipeline]` write-value reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RootRef {
    pub subpath: String,
    pub pipeline: Option<FilterPipeline>,
}

/// Parses a root-reference value string. Returns `Ok(None)` for strings
/// that don't start with `$$root` at all (not a root-reference). Any other
/// string starting with `$$root` that doesn't match one of the legal forms
/// (`$$root`, `$$root.<subpath>`, `$$root|$pipeline`) is a parse error.
pub fn parse_root_ref(path: &str, text: &str) -> Result<Option<RootRef>> {
    if !text.starts_with("$$root") {
        return Ok(None);
    }
    let rest = &text["$$root".len()..];
    if rest.is_empty() {
        return Ok(Some(RootRef {
            subpath: ".".to_string(),
            pipeline: None,
        }));
    }
    if let Some(pipe_pos) = find_top_level_pipe(rest) {
        let (subpath_part, pipeline_part) = (&rest[..pipe_pos], &rest[pipe_pos + 1..]);
        let subpath = if subpath_part.is_empty() {
            ".".to_string()
        } else if let Some(p) = subpath_part.strip_prefix('.') {
            if p.is_empty() {
                ".".to_string()
            } else {
                p.to_string()
            }
        } else {
            return Err(Error::parse(path, Some(text.to_string()), "malformed `$$root` reference"));
        };
        let pipeline = Some(parse_pipeline(path, pipeline_part)?);
        return Ok(Some(RootRef { subpath, pipeline }));
    }
    if let Some(p) = rest.strip_prefix('.') {
        let subpath = if p.is_empty() { ".".to_string() } else { p.to_string() };
        return Ok(Some(RootRef { subpath, pipeline: None }));
    }
    Err(Error::parse(path, Some(text.to_string()), "malformed `$$root` reference"))
}

fn find_top_level_pipe(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth -= 1,
            b'|' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_filter_name() {
        let p = parse_pipeline("p", "$double").unwrap();
        assert_eq!(p.segments.len(), 1);
        assert_eq!(p.segments[0].name, "double");
        assert!(p.segments[0].args.is_empty());
    }

    #[test]
    fn parses_curried_args_and_trailing_map_marker() {
        let p = parse_pipeline("p", "$add(2)[]").unwrap();
        assert_eq!(p.segments[0].name, "add");
        assert_eq!(p.segments[0].args, vec![Literal::Integer(2)]);
        assert!(p.segments[0].map_over_list);
    }

    #[test]
    fn parses_multi_segment_pipeline() {
        let p = parse_pipeline("p", "$add(2)|$double|$pow(2)").unwrap();
        assert_eq!(p.segments.len(), 3);
    }

    #[test]
    fn parses_keyword_arg() {
        let p = parse_pipeline("p", "$sorted(reverse=true)").unwrap();
        assert_eq!(p.segments[0].kwargs.get("reverse"), Some(&Literal::Bool(true)));
    }

    #[test]
    fn root_ref_bare() {
        let r = parse_root_ref("p", "$$root").unwrap().unwrap();
        assert_eq!(r.subpath, ".");
        assert!(r.pipeline.is_none());
    }

    #[test]
    fn root_ref_with_subpath() {
        let r = parse_root_ref("p", "$$root.d").unwrap().unwrap();
        assert_eq!(r.subpath, "d");
    }

    #[test]
    fn root_ref_with_pipeline() {
        let r = parse_root_ref("p", "$$root.d|$double").unwrap().unwrap();
        assert_eq!(r.subpath, "d");
        assert!(r.pipeline.is_some());
    }

    #[test]
    fn non_root_ref_returns_none() {
        assert!(parse_root_ref("p", "hello").unwrap().is_none());
    }

    #[test]
    fn malformed_root_ref_is_parse_error() {
        assert!(parse_root_ref("p", "$$rootXYZ").is_err());
    }
}
