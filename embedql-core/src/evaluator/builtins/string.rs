//! String builtin functions.
//!
//! Positions are 1-based and count characters, not bytes.

use super::{int_arg, text_arg};
use crate::error::EvalResult;
use crate::keywords::Function;
use crate::value::Value;

/// Call a string function. Returns None if function not found.
pub fn call(function: Function, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match function {
        Function::Upper => text_arg(function, args, 0)?.map(|s| Value::Text(s.to_uppercase())),

        Function::Lower => text_arg(function, args, 0)?.map(|s| Value::Text(s.to_lowercase())),

        Function::Length => match &args[0] {
            Value::Null => None,
            Value::Blob(b) => Some(Value::Integer(b.len() as i64)),
            Value::Array(a) => Some(Value::Integer(a.len() as i64)),
            Value::Object(o) => Some(Value::Integer(o.len() as i64)),
            other => Some(Value::Integer(other.to_string().chars().count() as i64)),
        },

        Function::Substr => {
            let Some(s) = text_arg(function, args, 0)? else {
                return Ok(Some(Value::Null));
            };
            let Some(start) = int_arg(function, args, 1)? else {
                return Ok(Some(Value::Null));
            };
            let length = match args.get(2) {
                None => None,
                Some(Value::Null) => return Ok(Some(Value::Null)),
                Some(_) => int_arg(function, args, 2)?,
            };
            Some(Value::Text(substr(&s, start, length)))
        }

        Function::Trim | Function::Ltrim | Function::Rtrim => {
            let Some(s) = text_arg(function, args, 0)? else {
                return Ok(Some(Value::Null));
            };
            let set: Vec<char> = match args.get(1) {
                None => vec![' '],
                Some(Value::Null) => return Ok(Some(Value::Null)),
                Some(_) => text_arg(function, args, 1)?
                    .unwrap_or_default()
                    .chars()
                    .collect(),
            };
            let trimmed = match function {
                Function::Ltrim => s.trim_start_matches(set.as_slice()),
                Function::Rtrim => s.trim_end_matches(set.as_slice()),
                _ => s.trim_matches(set.as_slice()),
            };
            Some(Value::Text(trimmed.to_string()))
        }

        Function::Replace => {
            let (Some(s), Some(from), Some(to)) = (
                text_arg(function, args, 0)?,
                text_arg(function, args, 1)?,
                text_arg(function, args, 2)?,
            ) else {
                return Ok(Some(Value::Null));
            };
            if from.is_empty() {
                Some(Value::Text(s))
            } else {
                Some(Value::Text(s.replace(&from, &to)))
            }
        }

        Function::Instr => {
            let (Some(haystack), Some(needle)) =
                (text_arg(function, args, 0)?, text_arg(function, args, 1)?)
            else {
                return Ok(Some(Value::Null));
            };
            let position = haystack
                .find(&needle)
                .map(|byte| haystack[..byte].chars().count() as i64 + 1)
                .unwrap_or(0);
            Some(Value::Integer(position))
        }

        Function::Concat => {
            let mut result = String::new();
            for index in 0..args.len() {
                if let Some(s) = text_arg(function, args, index)? {
                    result.push_str(&s);
                }
            }
            Some(Value::Text(result))
        }

        Function::Hex => match &args[0] {
            Value::Null => Some(Value::Text(String::new())),
            Value::Blob(b) => Some(Value::Text(hex::encode_upper(b))),
            _ => text_arg(function, args, 0)?.map(|s| Value::Text(hex::encode_upper(s))),
        },

        Function::Char => {
            let mut result = String::new();
            for index in 0..args.len() {
                if let Some(code) = int_arg(function, args, index)? {
                    if let Some(c) = u32::try_from(code).ok().and_then(char::from_u32) {
                        result.push(c);
                    }
                }
            }
            Some(Value::Text(result))
        }

        Function::Unicode => match text_arg(function, args, 0)? {
            Some(s) => s.chars().next().map(|c| Value::Integer(c as i64)),
            None => None,
        },

        _ => return Ok(None),
    };

    Ok(Some(result.unwrap_or(Value::Null)))
}

/// Character substring with 1-based `start`.
///
/// A negative start counts from the end; a negative length takes the
/// characters before `start`. Start 0 refers to the position before the
/// first character.
fn substr(s: &str, start: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;

    let mut p1 = start;
    let mut p2 = length.unwrap_or(len.saturating_add(1));
    let negative_length = p2 < 0;
    if negative_length {
        p2 = p2.saturating_neg();
    }

    if p1 < 0 {
        p1 += len;
        if p1 < 0 {
            p2 += p1;
            if p2 < 0 {
                p2 = 0;
            }
            p1 = 0;
        }
    } else if p1 > 0 {
        p1 -= 1;
    } else if p2 > 0 {
        p2 -= 1;
    }

    if negative_length {
        p1 -= p2;
        if p1 < 0 {
            p2 += p1;
            p1 = 0;
        }
    }

    let from = p1.clamp(0, len) as usize;
    let to = p1.saturating_add(p2).clamp(0, len) as usize;
    if from >= to {
        return String::new();
    }
    chars[from..to].iter().collect()
}
