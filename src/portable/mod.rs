//! Portable text codec: a self-describing, human-readable notation for the
//! generic value model.
//!
//! ```text
//! @obj:person<name$=`Alice` age#=`30` tags=@array[$`a` $`b`] address=@obj:address<city$=`Lyon`>>
//! ```
//!
//! Every scalar carries a one-character type marker, so the text decodes to
//! exactly the value it was produced from:
//!
//! | marker | type |
//! |--------|------|
//! | `~` | null |
//! | `!` | boolean |
//! | `#` | integer |
//! | `^` | 32-bit float (read only) |
//! | `%` | double |
//! | `$` | text |
//! | `&` | blob (base64) |
//! | `*` | date/time (RFC 3339) |
//!
//! In objects the marker sits between the key and `=`; container fields use
//! a bare `=`. In arrays and at the root a scalar is its marker followed by
//! the quoted value. Backslash escapes the next character inside quoted
//! values, keys and names.

mod reader;
mod writer;

pub use reader::{from_text, from_text_named};
pub use writer::{to_text, to_text_named};

/// Object name used for the root when none is given.
pub const DEFAULT_ROOT_NAME: &str = "object";

pub(crate) const NULL: char = '~';
pub(crate) const BOOLEAN: char = '!';
pub(crate) const INTEGER: char = '#';
pub(crate) const FLOAT: char = '^';
pub(crate) const DOUBLE: char = '%';
pub(crate) const TEXT: char = '$';
pub(crate) const BLOB: char = '&';
pub(crate) const DATETIME: char = '*';

pub(crate) fn is_marker(c: char) -> bool {
    matches!(
        c,
        NULL | BOOLEAN | INTEGER | FLOAT | DOUBLE | TEXT | BLOB | DATETIME
    )
}

/// Characters that may appear unescaped in keys and object names.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use embedql_core::Value;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn round_trip(value: Value) {
        let text = to_text(&value);
        assert_eq!(from_text(&text).unwrap(), value, "text was: {}", text);
    }

    #[test]
    fn test_every_variant_round_trips() {
        let mut object = BTreeMap::new();
        object.insert("null".to_string(), Value::Null);
        object.insert("flag".to_string(), Value::Boolean(false));
        object.insert("count".to_string(), Value::Integer(i64::MIN));
        object.insert("ratio".to_string(), Value::Float(0.1));
        object.insert("huge".to_string(), Value::Float(1e300));
        object.insert("text".to_string(), Value::from("tick ` and \\ back"));
        object.insert("blob".to_string(), Value::Blob(vec![0, 255, 10]));
        object.insert(
            "when".to_string(),
            Value::DateTime(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()),
        );
        object.insert(
            "list".to_string(),
            Value::Array(vec![
                Value::Integer(1),
                Value::Null,
                Value::Array(vec![]),
                Value::from(json!({"inner": "x"})),
            ]),
        );
        object.insert("empty".to_string(), Value::Object(BTreeMap::new()));
        object.insert("odd key<=>".to_string(), Value::from(""));
        object.insert("".to_string(), Value::Integer(0));

        round_trip(Value::Object(object));
    }

    #[test]
    fn test_scalar_and_array_roots() {
        round_trip(Value::Null);
        round_trip(Value::from("plain"));
        round_trip(Value::Float(-2.5));
        round_trip(Value::Array(vec![Value::from("a"), Value::Boolean(true)]));
    }

    #[test]
    fn test_datetimes_outside_four_digit_years() {
        for year in [-5, 0, 1, 9999, 10000] {
            let when = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
            round_trip(Value::DateTime(when));
            round_trip(Value::Array(vec![Value::DateTime(
                when + chrono::Duration::milliseconds(250),
            )]));
        }
        assert_eq!(
            to_text(&Value::DateTime(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap())),
            "*`@253402300800`"
        );
    }

    #[test]
    fn test_format_shape() {
        let value = Value::from(json!({
            "name": "Alice",
            "age": 30,
            "tags": ["a"],
            "address": {"city": "Lyon"},
        }));
        assert_eq!(
            to_text_named(&value, "person"),
            "@obj:person<address=@obj:address<city$=`Lyon`> age#=`30` name$=`Alice` tags=@array[$`a`]>"
        );
    }
}
