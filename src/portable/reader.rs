use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use super::{
    is_marker, is_name_char, BLOB, BOOLEAN, DATETIME, DOUBLE, FLOAT, INTEGER, NULL, TEXT,
};
use crate::codec::datetime;
use crate::error::{FormatError, FormatResult};
use embedql_core::Value;

const MAX_DEPTH: usize = 256;

/// Parse portable text back into a value.
pub fn from_text(text: &str) -> FormatResult<Value> {
    from_text_named(text).map(|(_, value)| value)
}

/// Parse portable text, also returning the root object's name (empty when
/// the root is not an object).
pub fn from_text_named(text: &str) -> FormatResult<(String, Value)> {
    let result = Reader::new(text).read_document();
    if let Err(e) = &result {
        debug!("Rejected portable text ({} bytes): {}", text.len(), e);
    }
    result
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn read_document(&mut self) -> FormatResult<(String, Value)> {
        self.skip_whitespace();
        let (name, value) = match self.peek() {
            Some('@') if self.rest().starts_with("@obj:") => {
                let (name, map) = self.read_object()?;
                (name, Value::Object(map))
            }
            _ => (String::new(), self.read_value()?),
        };
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.malformed("trailing input after root value"));
        }
        Ok((name, value))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> FormatError {
        FormatError::Malformed {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn truncated(&self, expected: impl Into<String>) -> FormatError {
        FormatError::Truncated {
            offset: self.pos,
            expected: expected.into(),
        }
    }

    /// Consume `literal`; running out of input partway is truncation.
    fn expect(&mut self, literal: &str) -> FormatResult<()> {
        let rest = self.rest();
        if rest.starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else if literal.starts_with(rest) {
            Err(self.truncated(format!("'{}'", literal)))
        } else {
            Err(self.malformed(format!("expected '{}'", literal)))
        }
    }

    fn enter(&mut self) -> FormatResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.malformed("nesting too deep"));
        }
        Ok(())
    }

    fn read_value(&mut self) -> FormatResult<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some('@') => self.read_container(),
            Some(c) if is_marker(c) => {
                let offset = self.pos;
                self.bump();
                self.expect("`")?;
                let raw = self.read_quoted()?;
                scalar(c, raw, offset)
            }
            Some(c) => Err(FormatError::UnknownMarker {
                marker: c,
                offset: self.pos,
            }),
            None => Err(self.truncated("a value")),
        }
    }

    fn read_container(&mut self) -> FormatResult<Value> {
        let rest = self.rest();
        if rest.starts_with("@obj:") {
            self.read_object().map(|(_, map)| Value::Object(map))
        } else if rest.starts_with("@array[") {
            self.read_array().map(Value::Array)
        } else if "@obj:".starts_with(rest) || "@array[".starts_with(rest) {
            Err(self.truncated("'@obj:' or '@array['"))
        } else {
            Err(self.malformed("expected '@obj:' or '@array['"))
        }
    }

    fn read_object(&mut self) -> FormatResult<(String, BTreeMap<String, Value>)> {
        self.enter()?;
        self.expect("@obj:")?;
        let name = self.read_name()?;
        self.expect("<")?;

        let mut map = BTreeMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    let offset = self.pos;
                    let (key, value) = self.read_field()?;
                    if map.contains_key(&key) {
                        return Err(FormatError::DuplicateKey { key, offset });
                    }
                    map.insert(key, value);
                }
                None => return Err(self.truncated("'>'")),
            }
        }

        self.depth -= 1;
        Ok((name, map))
    }

    fn read_field(&mut self) -> FormatResult<(String, Value)> {
        let key = self.read_name()?;
        match self.peek() {
            Some('=') => {
                self.bump();
                Ok((key, self.read_container()?))
            }
            Some(c) if is_marker(c) => {
                let offset = self.pos;
                self.bump();
                self.expect("=`")?;
                let raw = self.read_quoted()?;
                Ok((key, scalar(c, raw, offset)?))
            }
            Some(c) => Err(FormatError::UnknownMarker {
                marker: c,
                offset: self.pos,
            }),
            None => Err(self.truncated("a type marker")),
        }
    }

    fn read_array(&mut self) -> FormatResult<Vec<Value>> {
        self.enter()?;
        self.expect("@array[")?;

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    self.bump();
                    break;
                }
                Some(_) => items.push(self.read_value()?),
                None => return Err(self.truncated("']'")),
            }
        }

        self.depth -= 1;
        Ok(items)
    }

    /// Key or object name: name characters plus backslash escapes.
    fn read_name(&mut self) -> FormatResult<String> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                match self.bump() {
                    Some(escaped) => name.push(escaped),
                    None => return Err(self.truncated("an escaped character")),
                }
            } else if is_name_char(c) {
                self.bump();
                name.push(c);
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// Body of a backtick-quoted value; the opening quote is already consumed.
    fn read_quoted(&mut self) -> FormatResult<String> {
        let mut raw = String::new();
        loop {
            match self.bump() {
                Some('`') => return Ok(raw),
                Some('\\') => match self.bump() {
                    Some(escaped) => raw.push(escaped),
                    None => return Err(self.truncated("an escaped character")),
                },
                Some(c) => raw.push(c),
                None => return Err(self.truncated("closing '`'")),
            }
        }
    }
}

fn scalar(marker: char, raw: String, offset: usize) -> FormatResult<Value> {
    let invalid = |kind: &'static str, value: String| FormatError::InvalidScalar {
        kind,
        value,
        offset,
    };

    match marker {
        NULL if raw.is_empty() => Ok(Value::Null),
        NULL => Err(invalid("null", raw)),
        BOOLEAN => match raw.as_str() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Err(invalid("boolean", raw)),
        },
        INTEGER => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid("integer", raw.clone())),
        FLOAT => raw
            .parse::<f32>()
            .map(|f| Value::Float(f as f64))
            .map_err(|_| invalid("float", raw.clone())),
        DOUBLE => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid("double", raw.clone())),
        TEXT => Ok(Value::Text(raw)),
        BLOB => STANDARD
            .decode(raw.as_bytes())
            .map(Value::Blob)
            .map_err(|_| invalid("blob", raw.clone())),
        DATETIME => datetime::parse(&raw)
            .map(Value::DateTime)
            .ok_or_else(|| invalid("date/time", raw.clone())),
        other => Err(FormatError::UnknownMarker {
            marker: other,
            offset,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_named_root() {
        let (name, value) =
            from_text_named("@obj:user< name$=`Ann`  tags=@array[ #`1` ^`0.5` ] >").unwrap();
        assert_eq!(name, "user");
        let object = value.as_object().unwrap();
        assert_eq!(object["name"], Value::from("Ann"));
        assert_eq!(
            object["tags"],
            Value::Array(vec![Value::Integer(1), Value::Float(0.5)])
        );
    }

    #[test]
    fn test_escapes() {
        let value = from_text("@obj:o<a\\ b$=`x\\`y\\\\z`>").unwrap();
        assert_eq!(value.as_object().unwrap()["a b"], Value::from("x`y\\z"));
    }

    #[test]
    fn test_unknown_marker() {
        let err = from_text("@obj:o<name?=`x`>").unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownMarker {
                marker: '?',
                offset: 11
            }
        );
        assert!(matches!(
            from_text("@array[?`1`]"),
            Err(FormatError::UnknownMarker { marker: '?', .. })
        ));
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            from_text("@obj:o<name$=`Ann"),
            Err(FormatError::Truncated { .. })
        ));
        assert!(matches!(
            from_text("@obj:o<name$=`Ann`"),
            Err(FormatError::Truncated { offset: 18, .. })
        ));
        assert!(matches!(
            from_text("@array[#`1`"),
            Err(FormatError::Truncated { .. })
        ));
        assert!(matches!(from_text(""), Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn test_duplicate_key() {
        let err = from_text("@obj:o<a#=`1` a#=`2`>").unwrap_err();
        assert_eq!(
            err,
            FormatError::DuplicateKey {
                key: "a".to_string(),
                offset: 14
            }
        );
    }

    #[test]
    fn test_invalid_scalars() {
        assert!(matches!(
            from_text("#`12x`"),
            Err(FormatError::InvalidScalar { kind: "integer", .. })
        ));
        assert!(matches!(
            from_text("!`yes`"),
            Err(FormatError::InvalidScalar { kind: "boolean", .. })
        ));
        assert!(matches!(
            from_text("&`***`"),
            Err(FormatError::InvalidScalar { kind: "blob", .. })
        ));
        assert!(matches!(
            from_text("*`yesterday`"),
            Err(FormatError::InvalidScalar { kind: "date/time", .. })
        ));
        assert!(matches!(
            from_text("~`x`"),
            Err(FormatError::InvalidScalar { kind: "null", .. })
        ));
    }

    #[test]
    fn test_trailing_input_is_malformed() {
        assert!(matches!(
            from_text("#`1` #`2`"),
            Err(FormatError::Malformed { offset: 5, .. })
        ));
        assert!(matches!(
            from_text("@set{}"),
            Err(FormatError::Malformed { offset: 0, .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}{}", "@array[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            from_text(&deep),
            Err(FormatError::Malformed { .. })
        ));
        let fine = format!("{}{}", "@array[".repeat(8), "]".repeat(8));
        assert!(from_text(&fine).is_ok());
    }
}
