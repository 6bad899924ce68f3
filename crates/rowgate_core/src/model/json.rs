//! Conversions between JSON values and SQL values.

use crate::store::{ColumnMetadata, Row};
use rusqlite::types::Value;
use serde_json::{Map, Number, Value as JsonValue};

/// Maps a JSON value onto the closest SQL storage class.
///
/// Booleans become `0`/`1`; arrays and objects are stored as JSON text.
pub fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => Value::Integer(integer),
            None => number.as_f64().map_or(Value::Null, Value::Real),
        },
        JsonValue::String(text) => Value::Text(text.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(value.to_string()),
    }
}

/// Maps a SQL value to JSON; non-finite reals become `null`.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(integer) => JsonValue::Number(Number::from(*integer)),
        Value::Real(real) => Number::from_f64(*real).map_or(JsonValue::Null, JsonValue::Number),
        Value::Text(text) => JsonValue::String(text.clone()),
        Value::Blob(bytes) => JsonValue::Array(
            bytes
                .iter()
                .map(|byte| JsonValue::Number(Number::from(*byte)))
                .collect(),
        ),
    }
}

/// Builds a JSON object keyed by result column name.
pub fn row_to_object(row: &Row, metadata: &ColumnMetadata) -> Map<String, JsonValue> {
    metadata
        .names()
        .iter()
        .zip(row.values())
        .map(|(name, value)| (name.clone(), value_to_json(value)))
        .collect()
}
