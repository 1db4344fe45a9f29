use std::fmt::Display;

use thiserror::Error;

pub use embedql_core::error::{EvalError, LexError, ParseError};

/// Failure while converting a typed value into the generic value model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Unsupported type {kind} at ${path}")]
    UnsupportedType { kind: String, path: String },

    #[error("Container {0} is not an {1}")]
    ContainerMismatch(usize, &'static str),

    #[error("Container {0} was already finished or attached twice")]
    ContainerReused(usize),

    #[error("Encode error: {0}")]
    Custom(String),
}

/// Failure while converting the generic value model into a typed value.
///
/// `path` is relative to the decoded root, e.g. `.address.city` or `.tags[2]`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Type mismatch at ${path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Invalid value at ${path}: {message}")]
    Invalid { path: String, message: String },
}

impl DecodeError {
    pub fn path(&self) -> &str {
        match self {
            DecodeError::TypeMismatch { path, .. } | DecodeError::Invalid { path, .. } => path,
        }
    }

    /// Prefix the path with an enclosing field name.
    pub(crate) fn in_field(self, key: &str) -> Self {
        self.prefixed(&format!(".{}", key))
    }

    /// Prefix the path with an enclosing sequence index.
    pub(crate) fn in_element(self, index: usize) -> Self {
        self.prefixed(&format!("[{}]", index))
    }

    fn prefixed(mut self, segment: &str) -> Self {
        match &mut self {
            DecodeError::TypeMismatch { path, .. } | DecodeError::Invalid { path, .. } => {
                path.insert_str(0, segment);
            }
        }
        self
    }
}

/// Failure while reading the portable text format. Offsets are byte offsets
/// into the input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Malformed portable text at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("Unknown type marker '{marker}' at offset {offset}")]
    UnknownMarker { marker: char, offset: usize },

    #[error("Truncated portable text at offset {offset}: expected {expected}")]
    Truncated { offset: usize, expected: String },

    #[error("Duplicate key '{key}' at offset {offset}")]
    DuplicateKey { key: String, offset: usize },

    #[error("Invalid {kind} value '{value}' at offset {offset}")]
    InvalidScalar {
        kind: &'static str,
        value: String,
        offset: usize,
    },
}

impl FormatError {
    pub fn offset(&self) -> usize {
        match self {
            FormatError::Malformed { offset, .. }
            | FormatError::UnknownMarker { offset, .. }
            | FormatError::Truncated { offset, .. }
            | FormatError::DuplicateKey { offset, .. }
            | FormatError::InvalidScalar { offset, .. } => *offset,
        }
    }
}

/// Any error the engine reports.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, Error>;
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type FormatResult<T> = std::result::Result<T, FormatError>;

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl serde::ser::Error for EncodeError {
    fn custom<T: Display>(msg: T) -> Self {
        EncodeError::Custom(msg.to_string())
    }
}

impl serde::de::Error for DecodeError {
    fn custom<T: Display>(msg: T) -> Self {
        DecodeError::Invalid {
            path: String::new(),
            message: msg.to_string(),
        }
    }

    fn invalid_type(unexp: serde::de::Unexpected, exp: &dyn serde::de::Expected) -> Self {
        DecodeError::TypeMismatch {
            path: String::new(),
            expected: exp.to_string(),
            found: unexp.to_string(),
        }
    }

    /// Right kind, wrong range: `300` for a `u8` field or `"ab"` for a `char`.
    fn invalid_value(unexp: serde::de::Unexpected, exp: &dyn serde::de::Expected) -> Self {
        Self::invalid_type(unexp, exp)
    }
}
