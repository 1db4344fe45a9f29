//! Core evaluation helpers.
//!
//! - get_field_value: resolve a (possibly dotted) field reference
//! - values_equal: structural equality used by IN
//! - compare_values: total ordering after type coercion
//! - order_values: ordering for `<`-style operators, failing without a common type
//! - arithmetic / negate / concat: operator semantics with NULL propagation
//! - pattern_match: LIKE, GLOB, REGEXP and MATCH

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};

use super::builtins::parse_datetime_text;
use super::EvalOptions;
use crate::ast::{BinaryOperator, Collation};
use crate::error::{EvalError, EvalResult};
use crate::value::{parse_number, Record, Value};

/// Look up `path` in a record.
///
/// The whole path is tried as a literal key first, so fields whose names
/// contain dots stay reachable. Otherwise the path is walked segment by
/// segment through objects (and arrays, by index).
pub fn get_field_value(record: &Record, path: &str) -> EvalResult<Value> {
    if let Some(value) = record.get(path) {
        return Ok(value.clone());
    }

    let mut segments = path.split('.');
    let first = segments.next().unwrap_or(path);
    let mut current = record
        .get(first)
        .ok_or_else(|| EvalError::MissingField(path.to_string()))?;

    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| EvalError::MissingField(path.to_string()))?;
    }

    Ok(current.clone())
}

/// Structural equality; integers and floats compare by numeric value.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            compare_numbers(left, right) == Ordering::Equal
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => left == right,
    }
}

/// Numeric view used by arithmetic: booleans count as 0/1 and numeric text
/// is parsed.
pub fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(_) | Value::Float(_) => Some(value.clone()),
        Value::Boolean(b) => Some(Value::Integer(*b as i64)),
        Value::Text(s) => parse_number(s),
        _ => None,
    }
}

fn compare_numbers(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        _ => {
            let a = left.as_f64().unwrap_or(0.0);
            let b = right.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
    }
}

pub fn compare_text(left: &str, right: &str, collation: Collation) -> Ordering {
    match collation {
        Collation::Binary => left.cmp(right),
        Collation::NoCase => left
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(right.bytes().map(|b| b.to_ascii_lowercase())),
        Collation::RTrim => left.trim_end_matches(' ').cmp(right.trim_end_matches(' ')),
    }
}

/// Text that reads as a boolean: `true`/`false` or a number.
fn text_as_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        parse_number(s).and_then(|n| n.as_f64()).map(|f| f != 0.0)
    }
}

/// Rank of a value's storage class when no coercion applies.
///
/// NULL < numbers < text < blob < date/time < array < object
fn class_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) | Value::Integer(_) | Value::Float(_) => 1,
        Value::Text(_) => 2,
        Value::Blob(_) => 3,
        Value::DateTime(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Compare two values after coercing them to a common type.
///
/// Numeric text compares as a number, date/time text as an instant. Values
/// with no common type order by storage class.
pub fn compare_values(left: &Value, right: &Value, collation: Collation) -> Ordering {
    coerced_ordering(left, right, collation)
        .unwrap_or_else(|| class_rank(left).cmp(&class_rank(right)))
}

/// Ordering for `<`, `<=`, `>`, `>=` and BETWEEN.
///
/// Unlike [`compare_values`], operands with no common type are an error:
/// `'abc' < 5` is a type mismatch rather than a storage-class ranking.
pub fn order_values(
    operator: &str,
    left: &Value,
    right: &Value,
    collation: Collation,
) -> EvalResult<Ordering> {
    coerced_ordering(left, right, collation).ok_or_else(|| EvalError::TypeMismatch {
        operator: operator.to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    })
}

fn coerced_ordering(left: &Value, right: &Value, collation: Collation) -> Option<Ordering> {
    use Value::*;

    let ordering = match (left, right) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,

        (Text(a), Text(b)) => compare_text(a, b, collation),
        (Blob(a), Blob(b)) => a.cmp(b),
        (Text(a), Blob(b)) => a.as_bytes().cmp(b.as_slice()),
        (Blob(a), Text(b)) => a.as_slice().cmp(b.as_bytes()),
        (DateTime(a), DateTime(b)) => a.cmp(b),

        (Boolean(a), Boolean(b)) => a.cmp(b),
        (Boolean(a), Text(s)) => a.cmp(&text_as_bool(s)?),
        (Text(s), Boolean(b)) => text_as_bool(s)?.cmp(b),

        (Boolean(_) | Integer(_) | Float(_), Boolean(_) | Integer(_) | Float(_)) => {
            let a = to_number(left).unwrap_or(Null);
            let b = to_number(right).unwrap_or(Null);
            compare_numbers(&a, &b)
        }
        (Integer(_) | Float(_), Text(s)) => compare_numbers(left, &parse_number(s)?),
        (Text(s), Integer(_) | Float(_)) => compare_numbers(&parse_number(s)?, right),

        (DateTime(a), Text(s)) => match parse_datetime_text(s) {
            Some(b) => a.cmp(&b),
            None => compare_text(&left.to_string(), s, collation),
        },
        (Text(s), DateTime(b)) => match parse_datetime_text(s) {
            Some(a) => a.cmp(b),
            None => compare_text(s, &right.to_string(), collation),
        },
        (DateTime(a), Integer(_) | Float(_)) => {
            compare_numbers(&Value::Integer(a.timestamp()), right)
        }
        (Integer(_) | Float(_), DateTime(b)) => {
            compare_numbers(left, &Value::Integer(b.timestamp()))
        }

        (Array(a), Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare_values(x, y, collation))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Object(a), Object(b)) => a
            .iter()
            .zip(b)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb, collation)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),

        _ => return None,
    };
    Some(ordering)
}

/// Evaluate `+ - * / %`; NULL in, NULL out.
///
/// Integer results that overflow are recomputed in floating point.
pub fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
        return Err(EvalError::TypeMismatch {
            operator: op.as_str().to_string(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        });
    };

    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, a, b),
        (a, b) => float_arithmetic(op, a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0)),
    }
}

fn integer_arithmetic(op: BinaryOperator, a: i64, b: i64) -> EvalResult<Value> {
    let result = match op {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        BinaryOperator::Divide => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_div(b)
        }
        BinaryOperator::Modulo => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            // i64::MIN % -1 overflows but is mathematically zero
            Some(a.checked_rem(b).unwrap_or(0))
        }
        _ => return float_arithmetic(op, a as f64, b as f64),
    };

    match result {
        Some(value) => Ok(Value::Integer(value)),
        None => float_arithmetic(op, a as f64, b as f64),
    }
}

fn float_arithmetic(op: BinaryOperator, a: f64, b: f64) -> EvalResult<Value> {
    let result = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide | BinaryOperator::Modulo if b == 0.0 => {
            return Err(EvalError::DivisionByZero)
        }
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        _ => {
            return Err(EvalError::TypeMismatch {
                operator: op.as_str().to_string(),
                left: "real".to_string(),
                right: "real".to_string(),
            })
        }
    };
    Ok(Value::Float(result))
}

/// Unary minus.
pub fn negate(value: &Value) -> EvalResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match to_number(value) {
        Some(Value::Integer(i)) => Ok(i
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or(Value::Float(-(i as f64)))),
        Some(Value::Float(f)) => Ok(Value::Float(-f)),
        _ => Err(EvalError::InvalidOperand {
            operator: "unary -".to_string(),
            operand: value.type_name().to_string(),
        }),
    }
}

/// `||` on the text renderings of both operands.
pub fn concat(left: &Value, right: &Value) -> Value {
    if left.is_null() || right.is_null() {
        return Value::Null;
    }
    Value::Text(format!("{}{}", left, right))
}

/// Compile a regex under the configured size limit.
pub fn safe_regex(pattern: &str, options: &EvalOptions, case_insensitive: bool) -> EvalResult<Regex> {
    RegexBuilder::new(pattern)
        .size_limit(options.regex_size_limit)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| EvalError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Translate a LIKE pattern: `%` any run, `_` one character; anchored.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex_pattern = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            _ => regex_pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    regex_pattern.push('$');
    regex_pattern
}

/// Translate a GLOB pattern: `*`, `?` and `[...]` classes; anchored.
pub fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex_pattern = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            '[' => match glob_class_end(&chars, i) {
                Some(end) => {
                    regex_pattern.push('[');
                    let mut j = i + 1;
                    if chars[j] == '^' {
                        regex_pattern.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if matches!(c, '\\' | '[' | ']' | '&' | '~') {
                            regex_pattern.push('\\');
                        }
                        regex_pattern.push(c);
                    }
                    regex_pattern.push(']');
                    i = end;
                }
                None => regex_pattern.push_str("\\["),
            },
            c => regex_pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    regex_pattern.push('$');
    regex_pattern
}

/// Index of the `]` closing a class opened at `open`. A `]` right after the
/// opening bracket (or after `^`) is a literal member.
fn glob_class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if chars.get(j) == Some(&'^') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

/// MATCH: every whitespace-separated term of `query` occurs as a word of
/// `text`, ignoring case. A query without terms matches nothing.
pub fn match_terms(text: &str, query: &str) -> bool {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut terms = query.split_whitespace().peekable();
    if terms.peek().is_none() {
        return false;
    }
    terms.all(|term| {
        let term = term.to_lowercase();
        words.iter().any(|w| *w == term)
    })
}

/// Apply a pattern operator to the text renderings of both operands.
pub fn pattern_match(
    op: BinaryOperator,
    text: &str,
    pattern: &str,
    options: &EvalOptions,
) -> EvalResult<bool> {
    if pattern.chars().count() > options.max_pattern_length {
        return Err(EvalError::InvalidPattern {
            pattern: pattern.chars().take(32).collect(),
            reason: format!(
                "pattern too long (max {} chars)",
                options.max_pattern_length
            ),
        });
    }

    match op {
        BinaryOperator::Like => {
            let re = safe_regex(&like_to_regex(pattern), options, !options.like_case_sensitive)?;
            Ok(re.is_match(text))
        }
        BinaryOperator::Glob => Ok(safe_regex(&glob_to_regex(pattern), options, false)?.is_match(text)),
        BinaryOperator::Regexp => Ok(safe_regex(pattern, options, false)?.is_match(text)),
        BinaryOperator::Match => Ok(match_terms(text, pattern)),
        _ => Err(EvalError::TypeMismatch {
            operator: op.as_str().to_string(),
            left: "text".to_string(),
            right: "text".to_string(),
        }),
    }
}
