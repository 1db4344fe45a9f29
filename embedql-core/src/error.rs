//! Error types for embedql-core.
//!
//! One enum per stage: lexing, parsing and evaluation. Every variant carries
//! the offending token text, field name or byte offset so callers can build a
//! user-facing message without re-reading the input.

use thiserror::Error;

/// Tokenizer failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unterminated {kind} starting at offset {offset}")]
    UnterminatedLiteral { kind: &'static str, offset: usize },
}

/// Parser failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Expected {expected}, found '{found}' at offset {offset}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("Expected {expected}, found end of input at offset {offset}")]
    UnexpectedEnd { expected: String, offset: usize },

    #[error("Unknown keyword '{word}' at offset {offset}")]
    UnknownKeyword { word: String, offset: usize },

    #[error("Unknown function '{name}' at offset {offset}")]
    UnknownFunction { name: String, offset: usize },

    #[error("Mismatched parenthesis '{found}' at offset {offset}")]
    MismatchedParenthesis { found: String, offset: usize },

    #[error("Malformed CASE expression at offset {offset}: {reason}")]
    MalformedCase { reason: String, offset: usize },

    #[error("Malformed argument list for {function} at offset {offset}: {reason}")]
    MalformedArguments {
        function: String,
        reason: String,
        offset: usize,
    },

    #[error("Expression nested deeper than {limit} levels at offset {offset}")]
    TooDeep { limit: usize, offset: usize },

    #[error("Statement {index}: {source}")]
    InStatement {
        index: usize,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Byte offset of the offending token, looking through statement wrappers.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Lex(LexError::UnterminatedLiteral { offset, .. })
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::UnexpectedEnd { offset, .. }
            | ParseError::UnknownKeyword { offset, .. }
            | ParseError::UnknownFunction { offset, .. }
            | ParseError::MismatchedParenthesis { offset, .. }
            | ParseError::MalformedCase { offset, .. }
            | ParseError::MalformedArguments { offset, .. }
            | ParseError::TooDeep { offset, .. } => *offset,
            ParseError::InStatement { source, .. } => source.offset(),
        }
    }

    /// Index of the failing statement when parsing a statement sequence.
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            ParseError::InStatement { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Evaluation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Field '{0}' not found in record")]
    MissingField(String),

    #[error("{function}() expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("{function}() argument {index}: expected {expected}, got {found}")]
    ArgumentType {
        function: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Operator {operator} is not defined for {left} and {right}")]
    TypeMismatch {
        operator: String,
        left: String,
        right: String,
    },

    #[error("Operator {operator} is not defined for {operand}")]
    InvalidOperand { operator: String, operand: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cannot cast {value} to {target}")]
    InvalidCast { value: String, target: String },

    #[error("Invalid date/time value '{0}'")]
    InvalidDate(String),

    #[error("{0} is not an aggregate function call")]
    NotAggregate(String),

    #[error("{0}() cannot be evaluated as a scalar function")]
    UnsupportedFunction(String),
}

pub type LexResult<T> = Result<T, LexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type EvalResult<T> = Result<T, EvalError>;

macro_rules! serialize_as_display {
    ($($ty:ty),*) => {
        $(
            impl serde::Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.collect_str(self)
                }
            }
        )*
    };
}

serialize_as_display!(LexError, ParseError, EvalError);
