use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{
    is_name_char, BLOB, BOOLEAN, DATETIME, DEFAULT_ROOT_NAME, DOUBLE, INTEGER, NULL, TEXT,
};
use crate::codec::datetime;
use embedql_core::Value;

/// Serialize a value; a root object is named [`DEFAULT_ROOT_NAME`].
pub fn to_text(value: &Value) -> String {
    to_text_named(value, DEFAULT_ROOT_NAME)
}

/// Serialize a value, naming the root object `root_name`.
pub fn to_text_named(value: &Value, root_name: &str) -> String {
    let mut out = String::new();
    write_value(&mut out, value, root_name);
    out
}

fn write_value(out: &mut String, value: &Value, name: &str) {
    match value {
        Value::Object(map) => write_object(out, map, name),
        Value::Array(items) => write_array(out, items),
        scalar => {
            out.push(marker(scalar));
            write_quoted(out, &raw(scalar));
        }
    }
}

fn write_object(out: &mut String, map: &BTreeMap<String, Value>, name: &str) {
    out.push_str("@obj:");
    write_name(out, name);
    out.push('<');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_name(out, key);
        match value {
            Value::Object(_) | Value::Array(_) => {
                out.push('=');
                write_value(out, value, key);
            }
            scalar => {
                out.push(marker(scalar));
                out.push('=');
                write_quoted(out, &raw(scalar));
            }
        }
    }
    out.push('>');
}

fn write_array(out: &mut String, items: &[Value]) {
    out.push_str("@array[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(out, item, "element");
    }
    out.push(']');
}

fn write_name(out: &mut String, name: &str) {
    for c in name.chars() {
        if !is_name_char(c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn write_quoted(out: &mut String, raw: &str) {
    out.push('`');
    for c in raw.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('`');
}

fn marker(value: &Value) -> char {
    match value {
        Value::Null => NULL,
        Value::Boolean(_) => BOOLEAN,
        Value::Integer(_) => INTEGER,
        Value::Float(_) => DOUBLE,
        Value::Text(_) => TEXT,
        Value::Blob(_) => BLOB,
        Value::DateTime(_) => DATETIME,
        // containers are written structurally
        Value::Array(_) | Value::Object(_) => NULL,
    }
}

fn raw(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        // Debug keeps the shortest representation that parses back exactly
        Value::Float(f) => format!("{:?}", f),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => STANDARD.encode(b),
        Value::DateTime(dt) => datetime::format(dt),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
