//! Path expressions over a `serde_json::Value` tree.
//!
//! An expression is a comma-separated list of alternatives. Each alternative is a
//! dot-separated chain of segments; a segment is a map key, optionally followed by
//! a list index (`items[2]`), or `_` for the current node. The first alternative
//! that resolves to a non-empty value wins. Empty strings, lists and maps count as
//! absent, so `"nickname,name"` falls back to `name` when `nickname` is `""`.

use crate::error::PathError;
use serde_json::Value;

/// The node itself, rather than a key of it.
pub const CURRENT: &str = "_";

struct Segment<'e> {
    name: &'e str,
    index: Option<usize>,
}

impl<'e> Segment<'e> {
    fn parse(raw: &'e str) -> Option<Self> {
        let (name, rest) = match raw.find('[') {
            Some(pos) => (&raw[..pos], &raw[pos..]),
            None => (raw, ""),
        };
        if name.is_empty() {
            return None;
        }
        let index = rest
            .strip_prefix('[')
            .and_then(|r| r.split_once(']'))
            .map(|(digits, _)| digits)
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|d| d.parse().ok());
        Some(Segment { name, index })
    }
}

/// Resolve `expr` against `data`. `Ok(None)` means absent (or empty); errors only
/// come from indexing a non-list or indexing past the end of a list.
pub fn get<'a>(data: &'a Value, expr: &str) -> Result<Option<&'a Value>, PathError> {
    for alternative in expr.split(',') {
        if let Some(v) = extract(data, alternative.trim())? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

fn extract<'a>(data: &'a Value, expr: &str) -> Result<Option<&'a Value>, PathError> {
    if expr.is_empty() {
        return Ok(None);
    }
    let mut current = data;
    for raw in expr.split('.') {
        if current.is_null() {
            return Ok(None);
        }
        let Some(segment) = Segment::parse(raw) else {
            return Ok(None);
        };
        let node = if segment.name == CURRENT {
            current
        } else {
            match current {
                Value::Object(map) => match map.get(segment.name) {
                    Some(v) => v,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            }
        };
        current = match segment.index {
            None => node,
            Some(index) => match node {
                Value::Array(items) => items.get(index).ok_or(PathError::IndexOutOfRange {
                    index,
                    len: items.len(),
                })?,
                other => {
                    return Err(PathError::NotAnArray {
                        segment: segment.name.to_string(),
                        found: kind_name(other),
                    })
                }
            },
        };
    }
    Ok(non_empty(current))
}

fn non_empty(v: &Value) -> Option<&Value> {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(m) if m.is_empty() => None,
        _ => Some(v),
    }
}

pub(crate) fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text form of a scalar; lists and maps render as compact JSON.
pub fn to_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Length of the list at `expr`; absent is 0.
pub fn len(data: &Value, expr: &str) -> Result<usize, PathError> {
    match get(data, expr)? {
        None => Ok(0),
        Some(Value::Array(items)) => Ok(items.len()),
        Some(other) => Err(PathError::NotAnArray {
            segment: expr.to_string(),
            found: kind_name(other),
        }),
    }
}

pub fn get_string(data: &Value, expr: &str, default: &str) -> Result<String, PathError> {
    Ok(get(data, expr)?.map(to_text).unwrap_or_else(|| default.to_string()))
}

/// Resolve to text and parse it, or return `default` when absent.
fn get_parsed<T>(
    data: &Value,
    expr: &str,
    default: T,
    target: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, PathError> {
    let s = get_string(data, expr, "")?;
    if s.is_empty() {
        return Ok(default);
    }
    parse(&s).ok_or(PathError::Parse { value: s, target })
}

fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        let f = s.parse::<f64>().ok()?;
        (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
    })
}

pub fn get_int(data: &Value, expr: &str, default: i32) -> Result<i32, PathError> {
    get_parsed(data, expr, default, "int", |s| {
        parse_integer(s).and_then(|n| i32::try_from(n).ok())
    })
}

pub fn get_long(data: &Value, expr: &str, default: i64) -> Result<i64, PathError> {
    get_parsed(data, expr, default, "long", parse_integer)
}

pub fn get_bool(data: &Value, expr: &str, default: bool) -> Result<bool, PathError> {
    get_parsed(data, expr, default, "bool", parse_bool)
}

pub fn get_float(data: &Value, expr: &str, default: f32) -> Result<f32, PathError> {
    get_parsed(data, expr, default, "float", |s| s.parse().ok())
}

pub fn get_double(data: &Value, expr: &str, default: f64) -> Result<f64, PathError> {
    get_parsed(data, expr, default, "double", |s| s.parse().ok())
}

/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
