//! Result columns resolved to output names.

use crate::case::NameCase;
use std::collections::HashMap;

/// Column name and database type name as reported by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDesc {
    pub name: String,
    pub type_name: String,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        ColumnDesc {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JsonKind {
    Number,
    Bool,
    Text,
}

impl JsonKind {
    fn of(type_name: &str) -> Self {
        match type_name.to_uppercase().as_str() {
            "INT" | "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "BIGINT" | "DECIMAL"
            | "NUMERIC" | "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => JsonKind::Number,
            "BOOL" | "BOOLEAN" => JsonKind::Bool,
            _ => JsonKind::Text,
        }
    }
}

/// One output column: the source column plus its resolved output name.
#[derive(Clone, Debug)]
pub struct Field {
    pub column: String,
    pub name: String,
    kind: JsonKind,
    /// `"name":` pre-encoded once per result set.
    json_key: Vec<u8>,
}

impl Field {
    /// Explicit mapping wins; otherwise the column name is converted.
    pub fn new(col: &ColumnDesc, map: &HashMap<String, String>, case: NameCase) -> Self {
        let name = match map.get(&col.name) {
            Some(mapped) => mapped.clone(),
            None => case.convert(&col.name),
        };
        let mut json_key = Vec::with_capacity(name.len() + 3);
        push_json_str(&mut json_key, name.as_bytes());
        json_key.push(b':');
        Field {
            column: col.name.clone(),
            name,
            kind: JsonKind::of(&col.type_name),
            json_key,
        }
    }

    /// Write `"name":value`. Numeric and boolean columns are written bare.
    pub fn append_json(&self, buf: &mut Vec<u8>, value: &[u8]) {
        buf.extend_from_slice(&self.json_key);
        match self.kind {
            JsonKind::Number if is_json_number(value) => buf.extend_from_slice(value),
            JsonKind::Bool => match value {
                b"t" | b"true" => buf.extend_from_slice(b"true"),
                b"f" | b"false" => buf.extend_from_slice(b"false"),
                _ => push_json_str(buf, value),
            },
            _ => push_json_str(buf, value),
        }
    }
}

/// Append one row as a JSON object. Empty values are omitted.
pub fn append_object(buf: &mut Vec<u8>, fields: &[Field], row: &[Vec<u8>]) {
    buf.push(b'{');
    let mut first = true;
    for (field, value) in fields.iter().zip(row) {
        if value.is_empty() {
            continue;
        }
        if !first {
            buf.push(b',');
        }
        first = false;
        field.append_json(buf, value);
    }
    buf.push(b'}');
}

// NaN / Infinity are valid numeric text but not valid JSON numbers.
fn is_json_number(value: &[u8]) -> bool {
    matches!(value.first(), Some(b'-' | b'0'..=b'9'))
        && value.last().map_or(false, u8::is_ascii_digit)
}

fn push_json_str(buf: &mut Vec<u8>, s: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    buf.push(b'"');
    for &b in s {
        match b {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0..=0x1f => buf.extend_from_slice(&[
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[(b >> 4) as usize],
                HEX[(b & 0xf) as usize],
            ]),
            _ => buf.push(b),
        }
    }
    buf.push(b'"');
}
