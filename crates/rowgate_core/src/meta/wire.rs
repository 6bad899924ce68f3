//! Wire types: how a value is bound to, or decoded from, a statement slot.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Bind/decode tag for one column or procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    BigInt,
    Varchar,
    Char,
    Double,
    /// Stored as integer `0`/`1`.
    Boolean,
    Blob,
}

impl WireType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Varchar => "varchar",
            Self::Char => "char",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Blob => "blob",
        }
    }

    /// Converts `value` into the representation this wire type binds as.
    ///
    /// `NULL` passes through unchanged. On failure returns the kind of the
    /// offending value, for error reporting.
    pub fn coerce(self, value: Value) -> Result<Value, &'static str> {
        if matches!(value, Value::Null) {
            return Ok(Value::Null);
        }

        match self {
            Self::Integer => match coerce_integer(value)? {
                Value::Integer(v) if i32::try_from(v).is_err() => Err("out-of-range integer"),
                other => Ok(other),
            },
            Self::BigInt => coerce_integer(value),
            Self::Varchar | Self::Char => match value {
                Value::Text(v) => Ok(Value::Text(v)),
                Value::Integer(v) => Ok(Value::Text(v.to_string())),
                Value::Real(v) => Ok(Value::Text(v.to_string())),
                other => Err(value_kind(&other)),
            },
            Self::Double => match value {
                Value::Real(v) => Ok(Value::Real(v)),
                Value::Integer(v) => Ok(Value::Real(v as f64)),
                Value::Text(v) => v
                    .trim()
                    .parse::<f64>()
                    .map(Value::Real)
                    .map_err(|_| "text"),
                other => Err(value_kind(&other)),
            },
            Self::Boolean => match value {
                Value::Integer(v @ (0 | 1)) => Ok(Value::Integer(v)),
                Value::Text(v) => match v.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Integer(1)),
                    "false" | "0" => Ok(Value::Integer(0)),
                    _ => Err("text"),
                },
                other => Err(value_kind(&other)),
            },
            Self::Blob => match value {
                Value::Blob(v) => Ok(Value::Blob(v)),
                Value::Text(v) => Ok(Value::Blob(v.into_bytes())),
                other => Err(value_kind(&other)),
            },
        }
    }
}

/// Storage type of the `id` key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryKeyType {
    Varchar,
    Char,
    Integer,
    BigInt,
}

impl PrimaryKeyType {
    /// Wire type the entity key is bound with.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Varchar => WireType::Varchar,
            Self::Char => WireType::Char,
            Self::Integer => WireType::Integer,
            Self::BigInt => WireType::BigInt,
        }
    }
}

/// Short name of a value's storage class.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}

/// `[-2^63, 2^63)`: the reals that convert to `i64` without saturating.
const I64_MIN_F64: f64 = i64::MIN as f64;
const I64_END_F64: f64 = -(i64::MIN as f64);

fn coerce_integer(value: Value) -> Result<Value, &'static str> {
    match value {
        Value::Integer(v) => Ok(Value::Integer(v)),
        Value::Real(v) if v.is_finite() && v.fract() == 0.0 => {
            if (I64_MIN_F64..I64_END_F64).contains(&v) {
                Ok(Value::Integer(v as i64))
            } else {
                Err("out-of-range real")
            }
        }
        Value::Text(v) => v
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| "text"),
        other => Err(value_kind(&other)),
    }
}
