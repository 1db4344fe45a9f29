//! Evaluator module for embedql expressions.
//!
//! An [`Evaluator`] walks an expression tree against one record and produces
//! a single [`Value`]. It is single-record scoped: aggregates over many
//! records are folded by the caller through an [`Aggregator`].

mod aggregate;
mod builtins;
mod clock;
mod helpers;

pub use aggregate::Aggregator;
pub use clock::{DateProvider, FixedClock, SystemClock};
pub use helpers::*;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::ast::{BinaryOperator, Collation, Expr, UnaryOperator};
use crate::error::EvalResult;
use crate::keywords::Function;
use crate::value::{Record, Value};

/// Tunables that change evaluation results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOptions {
    /// LIKE compares case-sensitively (default: true)
    pub like_case_sensitive: bool,
    /// Compiled size limit for LIKE/GLOB/REGEXP patterns in bytes (default: 1MB)
    pub regex_size_limit: usize,
    /// Maximum pattern length in characters (default: 1000)
    pub max_pattern_length: usize,
    /// Zone used by the `localtime` and `utc` date modifiers (default: UTC)
    pub timezone: Tz,
}

impl EvalOptions {
    pub const DEFAULT: EvalOptions = EvalOptions {
        like_case_sensitive: true,
        regex_size_limit: 1024 * 1024, // 1MB
        max_pattern_length: 1000,
        timezone: Tz::UTC,
    };
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static DEFAULT_OPTIONS: EvalOptions = EvalOptions::DEFAULT;
static SYSTEM_CLOCK: SystemClock = SystemClock;

/// Expression evaluator bound to options and a clock.
///
/// Cheap to copy; it only borrows its collaborators.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    options: &'a EvalOptions,
    clock: &'a dyn DateProvider,
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Evaluator {
            options: &DEFAULT_OPTIONS,
            clock: &SYSTEM_CLOCK,
        }
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(options: &'a EvalOptions, clock: &'a dyn DateProvider) -> Self {
        Self { options, clock }
    }

    pub fn options(&self) -> &EvalOptions {
        self.options
    }

    /// Current instant according to the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Evaluate `expr` against `record`.
    pub fn evaluate(&self, expr: &Expr, record: &Record) -> EvalResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Field(path) => get_field_value(record, path),

            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand, record)?;
                match op {
                    UnaryOperator::Not => Ok(invert(&value)),
                    UnaryOperator::Negate => negate(&value),
                    UnaryOperator::Plus => Ok(value),
                }
            }

            Expr::Binary {
                op,
                left,
                right,
                negate,
            } => {
                let result = self.evaluate_binary(*op, left, right, record)?;
                Ok(if *negate { invert(&result) } else { result })
            }

            Expr::FunctionCall { function, args } => self.evaluate_call(*function, args, record),

            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                // The operand is evaluated once, before any WHEN
                let base = match operand {
                    Some(operand) => Some((self.evaluate(operand, record)?, operand.collation())),
                    None => None,
                };

                for (when, then) in when_clauses {
                    let candidate = self.evaluate(when, record)?;
                    let matched = match &base {
                        Some((value, collation)) => {
                            !value.is_null()
                                && !candidate.is_null()
                                && compare_values(
                                    value,
                                    &candidate,
                                    collation.or(when.collation()).unwrap_or(Collation::Binary),
                                )
                                .is_eq()
                        }
                        None => candidate.truthy() == Some(true),
                    };
                    if matched {
                        return self.evaluate(then, record);
                    }
                }

                self.evaluate(else_clause, record)
            }

            Expr::Between {
                expr,
                low,
                high,
                negate,
            } => {
                let value = self.evaluate(expr, record)?;
                let low_value = self.evaluate(low, record)?;
                let high_value = self.evaluate(high, record)?;
                let collation = expr
                    .collation()
                    .or(low.collation())
                    .or(high.collation())
                    .unwrap_or(Collation::Binary);

                let above = order_nullable("BETWEEN", &value, &low_value, collation)?
                    .map(|o| o.is_ge());
                let below = order_nullable("BETWEEN", &value, &high_value, collation)?
                    .map(|o| o.is_le());
                let result = and3(above, below);
                Ok(bool3(if *negate { result.map(|b| !b) } else { result }))
            }

            Expr::In { expr, list, negate } => {
                let value = self.evaluate(expr, record)?;

                // Every candidate is evaluated, so errors surface regardless of order
                let mut found = false;
                let mut saw_null = false;
                for candidate in list {
                    let candidate = self.evaluate(candidate, record)?;
                    if candidate.is_null() {
                        saw_null = true;
                    } else if values_equal(&value, &candidate) {
                        found = true;
                    }
                }

                let result = if list.is_empty() {
                    Some(false)
                } else if value.is_null() {
                    None
                } else if found {
                    Some(true)
                } else if saw_null {
                    None
                } else {
                    Some(false)
                };
                Ok(bool3(if *negate { result.map(|b| !b) } else { result }))
            }

            Expr::Cast { expr, target } => builtins::cast(self.evaluate(expr, record)?, target),

            // Collation only affects the comparison that contains this node
            Expr::Collate { expr, .. } => self.evaluate(expr, record),
        }
    }

    /// Evaluate a predicate: true only when the result is truthy, NULL counts as false.
    pub fn check(&self, expr: &Expr, record: &Record) -> EvalResult<bool> {
        Ok(self.evaluate(expr, record)?.truthy() == Some(true))
    }

    fn evaluate_binary(
        &self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        record: &Record,
    ) -> EvalResult<Value> {
        // Handle short-circuit evaluation
        match op {
            BinaryOperator::And => {
                let left_val = self.evaluate(left, record)?.truthy();
                if left_val == Some(false) {
                    return Ok(Value::Boolean(false));
                }
                let right_val = self.evaluate(right, record)?.truthy();
                return Ok(bool3(and3(left_val, right_val)));
            }
            BinaryOperator::Or => {
                let left_val = self.evaluate(left, record)?.truthy();
                if left_val == Some(true) {
                    return Ok(Value::Boolean(true));
                }
                let right_val = self.evaluate(right, record)?.truthy();
                return Ok(bool3(match (left_val, right_val) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }));
            }
            _ => {}
        }

        let left_val = self.evaluate(left, record)?;
        let right_val = self.evaluate(right, record)?;
        let collation = left
            .collation()
            .or(right.collation())
            .unwrap_or(Collation::Binary);

        match op {
            BinaryOperator::Is => Ok(Value::Boolean(match (left_val.is_null(), right_val.is_null()) {
                (true, true) => true,
                (false, false) => compare_values(&left_val, &right_val, collation).is_eq(),
                _ => false,
            })),

            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                if left_val.is_null() || right_val.is_null() {
                    return Ok(Value::Null);
                }
                let equal = compare_values(&left_val, &right_val, collation).is_eq();
                Ok(Value::Boolean(equal == (op == BinaryOperator::Equal)))
            }

            BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual => {
                let Some(ordering) = order_nullable(op.as_str(), &left_val, &right_val, collation)?
                else {
                    return Ok(Value::Null);
                };
                Ok(Value::Boolean(match op {
                    BinaryOperator::LessThan => ordering.is_lt(),
                    BinaryOperator::LessThanOrEqual => ordering.is_le(),
                    BinaryOperator::GreaterThan => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }))
            }

            BinaryOperator::Like
            | BinaryOperator::Glob
            | BinaryOperator::Regexp
            | BinaryOperator::Match => {
                if left_val.is_null() || right_val.is_null() {
                    return Ok(Value::Null);
                }
                let matched = pattern_match(
                    op,
                    &left_val.to_string(),
                    &right_val.to_string(),
                    self.options,
                )?;
                Ok(Value::Boolean(matched))
            }

            BinaryOperator::Concat => Ok(concat(&left_val, &right_val)),

            _ => arithmetic(op, &left_val, &right_val),
        }
    }

    fn evaluate_call(&self, function: Function, args: &[Expr], record: &Record) -> EvalResult<Value> {
        match function {
            // Lazy: later arguments are only evaluated when needed
            Function::Coalesce | Function::IfNull => {
                builtins::check_arity(function, args.len())?;
                for arg in args {
                    let value = self.evaluate(arg, record)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }

            Function::Iif => {
                builtins::check_arity(function, args.len())?;
                if self.check(&args[0], record)? {
                    self.evaluate(&args[1], record)
                } else {
                    self.evaluate(&args[2], record)
                }
            }

            // A lone record is a group of one
            _ if function.is_aggregate(args.len()) => {
                let mut aggregator = Aggregator::for_call(*self, function, args)?;
                aggregator.accumulate(record)?;
                Ok(aggregator.finish())
            }

            _ => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg, record))
                    .collect::<EvalResult<Vec<_>>>()?;
                builtins::call(function, &values, self)
            }
        }
    }
}

/// Evaluate with default options and the system clock.
pub fn evaluate(expr: &Expr, record: &Record) -> EvalResult<Value> {
    Evaluator::default().evaluate(expr, record)
}

/// Ordering of two non-NULL values; None if either is NULL.
fn order_nullable(
    operator: &str,
    left: &Value,
    right: &Value,
    collation: Collation,
) -> EvalResult<Option<std::cmp::Ordering>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    order_values(operator, left, right, collation).map(Some)
}

fn and3(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn bool3(value: Option<bool>) -> Value {
    value.map(Value::Boolean).unwrap_or(Value::Null)
}

/// Logical NOT; NULL stays NULL.
fn invert(value: &Value) -> Value {
    bool3(value.truthy().map(|b| !b))
}
