//! Math builtin functions.

use std::cmp::Ordering;

use super::{int_arg, number_arg};
use crate::ast::Collation;
use crate::error::EvalResult;
use crate::evaluator::helpers::compare_values;
use crate::keywords::Function;
use crate::value::Value;

/// Call a math function. Returns None if function not found.
pub fn call(function: Function, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match function {
        Function::Abs => number_arg(function, args, 0)?.map(|n| match n {
            Value::Integer(i) => i
                .checked_abs()
                .map(Value::Integer)
                .unwrap_or(Value::Float((i as f64).abs())),
            other => Value::Float(other.as_f64().unwrap_or(0.0).abs()),
        }),

        Function::Round => {
            let digits = int_arg(function, args, 1)?.unwrap_or(0).clamp(0, 15) as i32;
            number_arg(function, args, 0)?.map(|n| {
                let x = n.as_f64().unwrap_or(0.0);
                let factor = 10f64.powi(digits);
                Value::Float((x * factor).round() / factor)
            })
        }

        Function::Sign => number_arg(function, args, 0)?.map(|n| {
            let sign = match n {
                Value::Integer(i) => i.signum(),
                other => match other.as_f64().unwrap_or(0.0) {
                    x if x > 0.0 => 1,
                    x if x < 0.0 => -1,
                    _ => 0,
                },
            };
            Value::Integer(sign)
        }),

        Function::Ceil => number_arg(function, args, 0)?.map(|n| match n {
            Value::Float(f) => Value::Float(f.ceil()),
            other => other,
        }),

        Function::Floor => number_arg(function, args, 0)?.map(|n| match n {
            Value::Float(f) => Value::Float(f.floor()),
            other => other,
        }),

        Function::Sqrt => number_arg(function, args, 0)?.and_then(|n| {
            let x = n.as_f64().unwrap_or(0.0);
            // negative input has no real root
            (x >= 0.0).then(|| Value::Float(x.sqrt()))
        }),

        Function::Power => {
            match (number_arg(function, args, 0)?, number_arg(function, args, 1)?) {
                (Some(base), Some(exp)) => {
                    let result = base
                        .as_f64()
                        .unwrap_or(0.0)
                        .powf(exp.as_f64().unwrap_or(0.0));
                    result.is_finite().then_some(Value::Float(result))
                }
                _ => None,
            }
        }

        // Scalar forms only; the single-argument forms aggregate.
        Function::Min | Function::Max if args.len() >= 2 => {
            if args.iter().any(Value::is_null) {
                None
            } else {
                let wanted = if function == Function::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                args.iter()
                    .cloned()
                    .reduce(|best, v| {
                        if compare_values(&v, &best, Collation::Binary) == wanted {
                            v
                        } else {
                            best
                        }
                    })
            }
        }

        _ => return Ok(None),
    };

    Ok(Some(result.unwrap_or(Value::Null)))
}
