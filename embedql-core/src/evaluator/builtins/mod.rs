//! Builtin scalar functions.
//!
//! Each family module answers `Ok(None)` for functions it does not own, so
//! dispatch walks the families in turn. Aggregates and the lazily evaluated
//! conditionals (`coalesce`, `ifnull`, `iif`) are handled by the evaluator
//! itself and never reach this table.

mod datetime;
mod math;
mod string;
mod type_check;

pub(crate) use datetime::parse_datetime_text;
pub(crate) use type_check::cast;

use super::helpers::to_number;
use super::Evaluator;
use crate::error::{EvalError, EvalResult};
use crate::keywords::Function;
use crate::value::Value;

/// Call a scalar builtin with already evaluated arguments.
pub(crate) fn call(function: Function, args: &[Value], evaluator: &Evaluator<'_>) -> EvalResult<Value> {
    check_arity(function, args.len())?;

    // String functions
    if let Some(result) = string::call(function, args)? {
        return Ok(result);
    }

    // Math functions
    if let Some(result) = math::call(function, args)? {
        return Ok(result);
    }

    // DateTime functions
    if let Some(result) = datetime::call(function, args, evaluator)? {
        return Ok(result);
    }

    // Type functions
    if let Some(result) = type_check::call(function, args)? {
        return Ok(result);
    }

    Err(EvalError::UnsupportedFunction(function.name().to_string()))
}

pub(crate) fn check_arity(function: Function, argc: usize) -> EvalResult<()> {
    let (min, max) = function.arity();
    if argc < min || max.is_some_and(|max| argc > max) {
        return Err(EvalError::Arity {
            function: function.name().to_string(),
            expected: function.arity_description(),
            found: argc,
        });
    }
    Ok(())
}

fn argument_type(function: Function, index: usize, expected: &str, found: &Value) -> EvalError {
    EvalError::ArgumentType {
        function: function.name().to_string(),
        index: index + 1,
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

/// Text rendering of argument `index`; `None` when it is NULL or absent.
fn text_arg(function: Function, args: &[Value], index: usize) -> EvalResult<Option<String>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            Err(argument_type(function, index, "text", v))
        }
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Integer argument; floats truncate, numeric text is parsed.
fn int_arg(function: Function, args: &[Value], index: usize) -> EvalResult<Option<i64>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match to_number(v) {
            Some(Value::Integer(i)) => Ok(Some(i)),
            Some(Value::Float(f)) => Ok(Some(f as i64)),
            _ => Err(argument_type(function, index, "integer", v)),
        },
    }
}

/// Numeric argument as integer or float value.
fn number_arg(function: Function, args: &[Value], index: usize) -> EvalResult<Option<Value>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => to_number(v)
            .map(Some)
            .ok_or_else(|| argument_type(function, index, "number", v)),
    }
}
