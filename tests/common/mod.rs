//! Shared fixtures for embedql integration tests

use embedql::{Record, Value};

/// Build a record from a JSON object literal.
pub fn record(json: serde_json::Value) -> Record {
    match Value::from(json) {
        Value::Object(map) => map,
        other => panic!("Expected a JSON object, got {}", other.type_name()),
    }
}

/// A customer row used across formula tests.
pub fn customer() -> Record {
    record(serde_json::json!({
        "name": "Alice",
        "age": 34,
        "balance": 120.5,
        "email": null,
        "vip": true,
        "tags": ["early", "beta"],
        "address": {"city": "Lyon", "zip": "69001"}
    }))
}
