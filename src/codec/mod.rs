//! Structured codec bridge between typed values and the generic value model.
//!
//! Any type implementing serde's `Serialize` encodes into a [`Value`]; any
//! `DeserializeOwned + Default` type decodes back. Struct fields become
//! object entries, sequences become arrays, unit enum variants become text
//! and data-carrying variants become single-key objects.

pub mod datetime;
mod decoder;
mod encoder;

pub use decoder::ValueDeserializer;
pub use encoder::{ContainerId, Encoder, Slot};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DecodeResult, EncodeResult};
use embedql_core::Value;

/// Encode a typed value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> EncodeResult<Value> {
    let mut encoder = Encoder::new();
    let root = encoder.encode(value)?;
    encoder.finish(root)
}

/// Decode a typed value. NULL yields `T::default()`.
///
/// Fields missing from an object are only tolerated where the type says so
/// (`#[serde(default)]` or `Option`); a present field of the wrong type is a
/// [`DecodeError::TypeMismatch`](crate::error::DecodeError::TypeMismatch)
/// naming its path.
pub fn decode<T: DeserializeOwned + Default>(value: Value) -> DecodeResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    T::deserialize(ValueDeserializer::new(value))
}
