//! embedql core - storage-independent SQL subset parser and expression evaluator.
//!
//! This crate provides the tokenizer, parsers and evaluator without any codec
//! or configuration concerns. Both statement execution and formula
//! evaluation go through the same parser and evaluator.
//!
//! # Main Components
//!
//! - **Lexer**: Splits input into a destructive token queue
//! - **Parser**: Builds expression and statement trees from that queue
//! - **AST**: Expression and statement nodes, serializable for inspection
//! - **Evaluator**: Evaluates an expression against one record
//!
//! # Example
//!
//! ```rust
//! use embedql_core::{evaluate, parse_formula, Record, Value};
//!
//! let mut record = Record::new();
//! record.insert("price".to_string(), Value::Integer(12));
//! record.insert("qty".to_string(), Value::Integer(3));
//!
//! let expr = parse_formula("price * qty >= 30").unwrap();
//! assert_eq!(evaluate(&expr, &record).unwrap(), Value::Boolean(true));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod keywords;
pub mod lexer;
pub mod parser;
pub mod value;

// Re-export main types for convenience
pub use ast::{
    Affinity, BinaryOperator, Collation, ColumnDef, CreateTableStatement, DeleteStatement,
    DropTableStatement, Expr, InsertStatement, SelectStatement, Statement, TypeName,
    UnaryOperator, UpdateStatement,
};
pub use error::{EvalError, EvalResult, LexError, LexResult, ParseError, ParseResult};
pub use evaluator::{
    evaluate, Aggregator, DateProvider, EvalOptions, Evaluator, FixedClock, SystemClock,
};
pub use keywords::{Function, Keyword};
pub use lexer::{tokenize, Token, TokenKind, TokenQueue};
pub use parser::{parse_expression, parse_formula, parse_statement, parse_statements, Parser};
pub use value::{Record, Value};
