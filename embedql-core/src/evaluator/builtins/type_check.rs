//! Type inspection and conversion: `typeof`, `nullif` and CAST.

use chrono::DateTime;

use super::parse_datetime_text;
use crate::ast::{Affinity, Collation, TypeName};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::helpers::compare_values;
use crate::keywords::Function;
use crate::value::{parse_number, Value};

/// Call a type function. Returns None if function not found.
pub fn call(function: Function, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match function {
        Function::TypeOf => Value::Text(args[0].type_name().to_string()),

        Function::NullIf => {
            let (left, right) = (&args[0], &args[1]);
            if !left.is_null()
                && !right.is_null()
                && compare_values(left, right, Collation::Binary).is_eq()
            {
                Value::Null
            } else {
                left.clone()
            }
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

/// Convert `value` to the storage class of `target`.
///
/// NULL casts to NULL. Text that does not read as the target type is an
/// error rather than a silent zero.
pub(crate) fn cast(value: Value, target: &TypeName) -> EvalResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let invalid = |value: &Value| EvalError::InvalidCast {
        value: value.to_string(),
        target: target.name.clone(),
    };

    let result = match target.affinity {
        Affinity::Integer => match &value {
            Value::Integer(_) => Some(value.clone()),
            Value::Float(f) => float_to_integer(*f),
            Value::Boolean(b) => Some(Value::Integer(*b as i64)),
            Value::DateTime(dt) => Some(Value::Integer(dt.timestamp())),
            Value::Text(_) | Value::Blob(_) => match parse_number(&value.to_string()) {
                Some(Value::Float(f)) => float_to_integer(f),
                other => other,
            },
            Value::Array(_) | Value::Object(_) | Value::Null => None,
        },

        Affinity::Real => match &value {
            Value::Integer(i) => Some(Value::Float(*i as f64)),
            Value::Float(_) => Some(value.clone()),
            Value::Boolean(b) => Some(Value::Float(*b as i64 as f64)),
            Value::DateTime(dt) => Some(Value::Float(dt.timestamp_millis() as f64 / 1000.0)),
            Value::Text(_) | Value::Blob(_) => parse_number(&value.to_string())
                .and_then(|n| n.as_f64())
                .map(Value::Float),
            Value::Array(_) | Value::Object(_) | Value::Null => None,
        },

        Affinity::Numeric => match &value {
            Value::Integer(_) => Some(value.clone()),
            Value::Float(f) => Some(narrow_float(*f)),
            Value::Boolean(b) => Some(Value::Integer(*b as i64)),
            Value::DateTime(dt) => Some(Value::Integer(dt.timestamp())),
            Value::Text(_) | Value::Blob(_) => match parse_number(&value.to_string()) {
                Some(Value::Float(f)) => Some(narrow_float(f)),
                other => other,
            },
            Value::Array(_) | Value::Object(_) | Value::Null => None,
        },

        Affinity::Text => match &value {
            Value::Blob(b) => String::from_utf8(b.clone()).ok().map(Value::Text),
            other => Some(Value::Text(other.to_string())),
        },

        Affinity::Blob => match &value {
            Value::Blob(_) => Some(value.clone()),
            other => Some(Value::Blob(other.to_string().into_bytes())),
        },

        Affinity::Boolean => match &value {
            Value::Boolean(_) => Some(value.clone()),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(Value::Boolean(true)),
                "false" | "no" | "off" => Some(Value::Boolean(false)),
                _ => parse_number(s)
                    .and_then(|n| n.as_f64())
                    .map(|f| Value::Boolean(f != 0.0)),
            },
            other => other.truthy().map(Value::Boolean),
        },

        Affinity::DateTime => match &value {
            Value::DateTime(_) => Some(value.clone()),
            Value::Integer(secs) => DateTime::from_timestamp(*secs, 0).map(Value::DateTime),
            Value::Float(secs) if secs.is_finite() => {
                DateTime::from_timestamp_millis((secs * 1000.0).round() as i64).map(Value::DateTime)
            }
            Value::Text(s) => parse_datetime_text(s).map(Value::DateTime),
            _ => None,
        },
    };

    result.ok_or_else(|| invalid(&value))
}

/// Truncate toward zero when the result fits an integer.
fn float_to_integer(f: f64) -> Option<Value> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::Integer(f.trunc() as i64))
    } else {
        None
    }
}

/// NUMERIC keeps integral floats as integers.
fn narrow_float(f: f64) -> Value {
    if f.fract() == 0.0 {
        float_to_integer(f).unwrap_or(Value::Float(f))
    } else {
        Value::Float(f)
    }
}
