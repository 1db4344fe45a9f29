//! Embedded SQL-subset query engine.
//!
//! Parses formulas and statements, evaluates expressions against in-memory
//! records, and converts between typed Rust values, the generic [`Value`]
//! model and a portable text notation.
//!
//! ```
//! use embedql::{evaluate, parse_expression, Record, Value};
//!
//! let expr = parse_expression("price * (1 - discount)").unwrap();
//! let mut record = Record::new();
//! record.insert("price".to_string(), Value::Integer(200));
//! record.insert("discount".to_string(), Value::Float(0.25));
//! assert_eq!(evaluate(&expr, &record).unwrap(), Value::Float(150.0));
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod portable;
pub mod telemetry;

pub use codec::{decode, encode};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{
    DecodeError, DecodeResult, EncodeError, EncodeResult, Error, FormatError, FormatResult, Result,
};
pub use portable::{from_text, to_text};

pub use embedql_core::{
    ast, Aggregator, DateProvider, EvalError, EvalOptions, Evaluator, Expr, FixedClock, LexError,
    ParseError, Record, Statement, SystemClock, Value,
};

/// Parse a `;`-separated batch of statements.
pub fn parse_statements(text: &str) -> Result<Vec<Statement>> {
    Ok(embedql_core::parse_statements(text)?)
}

/// Parse a standalone formula.
pub fn parse_expression(text: &str) -> Result<Expr> {
    Ok(embedql_core::parse_formula(text)?)
}

/// Evaluate with default options and the system clock.
pub fn evaluate(expr: &Expr, record: &Record) -> Result<Value> {
    Ok(embedql_core::evaluate(expr, record)?)
}
