//! Caller-driven aggregate accumulation.
//!
//! The evaluator only ever sees one record, so aggregates are folded by the
//! caller: build an [`Aggregator`] from the aggregate call, feed it every
//! record of the group with [`Aggregator::accumulate`], then read the result
//! with [`Aggregator::finish`].

use tracing::trace;

use super::builtins::check_arity;
use super::helpers::{compare_values, to_number};
use super::Evaluator;
use crate::ast::{Collation, Expr};
use crate::error::{EvalError, EvalResult};
use crate::keywords::Function;
use crate::value::{Record, Value};

#[derive(Debug, Clone)]
enum State {
    Count(i64),
    Sum {
        integer: i64,
        float: f64,
        is_float: bool,
        seen: bool,
    },
    Average {
        total: f64,
        count: i64,
    },
    Extreme(Option<Value>),
    GroupConcat(Option<String>),
}

/// Running state of one aggregate call.
#[derive(Clone)]
pub struct Aggregator<'a> {
    evaluator: Evaluator<'a>,
    function: Function,
    argument: Option<&'a Expr>,
    separator: Option<&'a Expr>,
    rows: usize,
    state: State,
}

impl<'a> Aggregator<'a> {
    /// Aggregator using the default evaluator (system clock, default options).
    pub fn new(expr: &'a Expr) -> EvalResult<Self> {
        Aggregator::with_evaluator(Evaluator::default(), expr)
    }

    /// Build from an aggregate call expression such as `sum(price * qty)`.
    pub fn with_evaluator(evaluator: Evaluator<'a>, expr: &'a Expr) -> EvalResult<Self> {
        match expr {
            Expr::FunctionCall { function, args } if function.is_aggregate(args.len()) => {
                Aggregator::for_call(evaluator, *function, args)
            }
            Expr::FunctionCall { function, .. } => {
                Err(EvalError::NotAggregate(format!("{}()", function.name())))
            }
            _ => Err(EvalError::NotAggregate("expression".to_string())),
        }
    }

    pub(crate) fn for_call(
        evaluator: Evaluator<'a>,
        function: Function,
        args: &'a [Expr],
    ) -> EvalResult<Self> {
        check_arity(function, args.len())?;

        let state = match function {
            Function::Count => State::Count(0),
            Function::Sum | Function::Total => State::Sum {
                integer: 0,
                float: 0.0,
                is_float: function == Function::Total,
                seen: false,
            },
            Function::Avg => State::Average {
                total: 0.0,
                count: 0,
            },
            Function::Min | Function::Max => State::Extreme(None),
            Function::GroupConcat => State::GroupConcat(None),
            other => return Err(EvalError::NotAggregate(format!("{}()", other.name()))),
        };

        Ok(Self {
            evaluator,
            function,
            argument: args.first(),
            separator: args.get(1),
            rows: 0,
            state,
        })
    }

    pub fn function(&self) -> Function {
        self.function
    }

    /// Number of records accumulated so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Fold one record into the running state. NULL arguments are skipped.
    pub fn accumulate(&mut self, record: &Record) -> EvalResult<()> {
        self.rows += 1;

        let value = match self.argument {
            Some(arg) => self.evaluator.evaluate(arg, record)?,
            // count(*)
            None => Value::Boolean(true),
        };

        trace!(
            function = %self.function,
            rows = self.rows,
            null = value.is_null(),
            "accumulating aggregate"
        );

        if value.is_null() {
            return Ok(());
        }

        let function = self.function;
        match &mut self.state {
            State::Count(count) => *count += 1,

            State::Sum {
                integer,
                float,
                is_float,
                seen,
            } => {
                let number = to_number(&value).ok_or_else(|| argument_type(function, &value))?;
                *seen = true;
                match number {
                    Value::Integer(i) if !*is_float => match integer.checked_add(i) {
                        Some(sum) => *integer = sum,
                        None => {
                            *is_float = true;
                            *float = *integer as f64 + i as f64;
                        }
                    },
                    other => {
                        if !*is_float {
                            *is_float = true;
                            *float = *integer as f64;
                        }
                        *float += other.as_f64().unwrap_or(0.0);
                    }
                }
            }

            State::Average { total, count } => {
                let number = to_number(&value).ok_or_else(|| argument_type(function, &value))?;
                *total += number.as_f64().unwrap_or(0.0);
                *count += 1;
            }

            State::Extreme(best) => {
                let wanted = if function == Function::Min {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                };
                let replace = match best {
                    None => true,
                    Some(current) => compare_values(&value, current, Collation::Binary) == wanted,
                };
                if replace {
                    *best = Some(value);
                }
            }

            State::GroupConcat(joined) => {
                let text = value.to_string();
                match joined {
                    None => *joined = Some(text),
                    Some(existing) => {
                        let separator = match self.separator {
                            Some(sep) => self.evaluator.evaluate(sep, record)?.to_string(),
                            None => ",".to_string(),
                        };
                        existing.push_str(&separator);
                        existing.push_str(&text);
                    }
                }
            }
        }

        Ok(())
    }

    /// Result over everything accumulated so far.
    ///
    /// `count` and `total` of no rows are 0; the others are NULL.
    pub fn finish(&self) -> Value {
        match &self.state {
            State::Count(count) => Value::Integer(*count),
            State::Sum {
                integer,
                float,
                is_float,
                seen,
            } => {
                if self.function == Function::Total {
                    Value::Float(*float)
                } else if !*seen {
                    Value::Null
                } else if *is_float {
                    Value::Float(*float)
                } else {
                    Value::Integer(*integer)
                }
            }
            State::Average { total, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Float(*total / *count as f64)
                }
            }
            State::Extreme(best) => best.clone().unwrap_or(Value::Null),
            State::GroupConcat(joined) => joined.clone().map(Value::Text).unwrap_or(Value::Null),
        }
    }
}

fn argument_type(function: Function, value: &Value) -> EvalError {
    EvalError::ArgumentType {
        function: function.name().to_string(),
        index: 1,
        expected: "number".to_string(),
        found: value.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn rows(values: &[Value]) -> Vec<Record> {
        values
            .iter()
            .map(|v| {
                let mut record = Record::new();
                record.insert("x".to_string(), v.clone());
                record.insert("name".to_string(), Value::from("n"));
                record
            })
            .collect()
    }

    fn aggregate(formula: &str, values: &[Value]) -> EvalResult<Value> {
        let expr = parse_formula(formula).unwrap();
        let mut aggregator = Aggregator::with_evaluator(Evaluator::default(), &expr)?;
        for record in rows(values) {
            aggregator.accumulate(&record)?;
        }
        Ok(aggregator.finish())
    }

    #[test]
    fn test_count() {
        let values = [Value::Integer(1), Value::Null, Value::Integer(3)];
        assert_eq!(aggregate("count(*)", &values).unwrap(), Value::Integer(3));
        assert_eq!(aggregate("count(x)", &values).unwrap(), Value::Integer(2));
        assert_eq!(aggregate("count(x)", &[]).unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_sum_total_avg() {
        let ints = [Value::Integer(1), Value::Integer(2), Value::Null];
        assert_eq!(aggregate("sum(x)", &ints).unwrap(), Value::Integer(3));
        assert_eq!(aggregate("total(x)", &ints).unwrap(), Value::Float(3.0));
        assert_eq!(aggregate("avg(x)", &ints).unwrap(), Value::Float(1.5));

        let mixed = [Value::Integer(1), Value::Float(0.5)];
        assert_eq!(aggregate("sum(x)", &mixed).unwrap(), Value::Float(1.5));

        assert_eq!(aggregate("sum(x)", &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(aggregate("total(x)", &[]).unwrap(), Value::Float(0.0));
        assert_eq!(aggregate("avg(x)", &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_sum_overflow_promotes() {
        let values = [Value::Integer(i64::MAX), Value::Integer(1)];
        assert_eq!(
            aggregate("sum(x)", &values).unwrap(),
            Value::Float(i64::MAX as f64 + 1.0)
        );
    }

    #[test]
    fn test_sum_rejects_text() {
        assert!(matches!(
            aggregate("sum(x)", &[Value::from("abc")]),
            Err(EvalError::ArgumentType { .. })
        ));
        assert_eq!(
            aggregate("avg(x)", &[Value::Integer(1), Value::from("abc")]).unwrap_err(),
            EvalError::ArgumentType {
                function: "avg".to_string(),
                index: 1,
                expected: "number".to_string(),
                found: "text".to_string(),
            }
        );
    }

    #[test]
    fn test_min_max() {
        let values = [Value::Integer(4), Value::Float(2.5), Value::Null, Value::Integer(9)];
        assert_eq!(aggregate("min(x)", &values).unwrap(), Value::Float(2.5));
        assert_eq!(aggregate("max(x)", &values).unwrap(), Value::Integer(9));
        assert_eq!(aggregate("max(x)", &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_group_concat() {
        let values = [Value::from("a"), Value::Null, Value::from("b")];
        assert_eq!(aggregate("group_concat(x)", &values).unwrap(), Value::from("a,b"));
        assert_eq!(
            aggregate("group_concat(x, ' | ')", &values).unwrap(),
            Value::from("a | b")
        );
    }

    #[test]
    fn test_argument_expression_is_evaluated_per_row() {
        let values = [Value::Integer(2), Value::Integer(3)];
        assert_eq!(aggregate("sum(x * 10)", &values).unwrap(), Value::Integer(50));
    }

    #[test]
    fn test_rejects_non_aggregates() {
        assert_eq!(
            aggregate("upper(name)", &[]).unwrap_err(),
            EvalError::NotAggregate("upper()".to_string())
        );
        assert!(matches!(
            aggregate("max(x, 1)", &[]),
            Err(EvalError::NotAggregate(_))
        ));
        assert!(matches!(aggregate("x + 1", &[]), Err(EvalError::NotAggregate(_))));
    }
}
