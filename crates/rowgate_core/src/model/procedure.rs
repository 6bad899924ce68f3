//! Stored-procedure invocation.
//!
//! # Responsibility
//! - Bind a named-argument map onto the call's slot map.
//! - Run a call in one of three modes: no result, one scalar, or rows.
//!
//! # Invariants
//! - A missing or `NULL` argument binds as a typed SQL `NULL`; it is never
//!   an error.
//! - Without an argument map every declared input binds as `NULL`.

use crate::db::DbError;
use crate::error::{ModelError, ModelResult};
use crate::meta::procedure::{ProcMetaData, Slot, SlotRole};
use crate::meta::wire::WireType;
use crate::model::values::ColumnValues;
use crate::store::{BoundParam, CallSpec, RowCursor, Store};
use log::{debug, error};
use rusqlite::types::Value;

/// Function result decoded by its declared wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i32),
    Long(i64),
    Text(String),
    /// Any other wire type, or a `NULL` result.
    Other(Value),
}

impl Scalar {
    /// Interprets the scalar as a row count.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Self::Integer(value) => usize::try_from(*value).ok(),
            Self::Long(value) => usize::try_from(*value).ok(),
            Self::Text(_) | Self::Other(_) => None,
        }
    }
}

/// A callable procedure with its precomputed slot map.
#[derive(Debug, Clone)]
pub struct Procedure {
    meta: ProcMetaData,
    slots: Vec<Slot>,
    call_sql: String,
}

impl Procedure {
    pub fn new(meta: ProcMetaData) -> Self {
        let slots = meta.slots();
        let call_sql = meta.call_sql();
        Self {
            meta,
            slots,
            call_sql,
        }
    }

    pub fn meta(&self) -> &ProcMetaData {
        &self.meta
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Bind directives for every slot, in slot order.
    pub fn bind(&self, args: Option<&ColumnValues>) -> Vec<BoundParam> {
        self.slots
            .iter()
            .map(|slot| match &slot.role {
                SlotRole::Return(wire) => BoundParam::out(slot.position, *wire),
                SlotRole::Input { name, wire } => match args.and_then(|args| args.get(name)) {
                    Some(Value::Null) | None => BoundParam::null(slot.position, *wire),
                    Some(value) => BoundParam::value(slot.position, value.clone(), *wire),
                },
            })
            .collect()
    }

    /// Runs the call for its side effects; returns the store's affected count.
    pub fn execute_procedure<S: Store>(
        &self,
        store: &S,
        args: Option<&ColumnValues>,
    ) -> ModelResult<usize> {
        debug!(
            "event=procedure_call module=model status=start procedure={} mode=procedure",
            self.meta.name()
        );
        let outcome = store
            .execute_call(&self.call_spec(), &self.bind(args))
            .map_err(|err| self.log_failure("procedure", err))?;
        Ok(outcome.affected)
    }

    /// Runs the call and decodes its output parameter.
    ///
    /// Returns `None` when the descriptor declares no return type.
    pub fn execute_function<S: Store>(
        &self,
        store: &S,
        args: Option<&ColumnValues>,
    ) -> ModelResult<Option<Scalar>> {
        debug!(
            "event=procedure_call module=model status=start procedure={} mode=function",
            self.meta.name()
        );
        let outcome = store
            .execute_call(&self.call_spec(), &self.bind(args))
            .map_err(|err| self.log_failure("function", err))?;

        let Some(wire) = self.meta.return_type() else {
            return Ok(None);
        };
        let value = outcome
            .output(1)
            .cloned()
            .ok_or(DbError::MissingOutput(1))?;
        Ok(Some(decode_scalar(1, wire, value)?))
    }

    /// Runs the call and lends its result cursor to `read`.
    pub fn execute_query<S, T, F>(
        &self,
        store: &S,
        args: Option<&ColumnValues>,
        read: F,
    ) -> ModelResult<T>
    where
        S: Store,
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>,
    {
        debug!(
            "event=procedure_call module=model status=start procedure={} mode=query",
            self.meta.name()
        );
        store
            .execute_call_query(&self.call_spec(), &self.bind(args), read)
            .inspect_err(|err| {
                if matches!(err, ModelError::NotFound { .. }) {
                    return;
                }
                error!(
                    "event=procedure_call module=model status=error procedure={} mode=query error={err}",
                    self.meta.name()
                );
            })
    }

    fn call_spec(&self) -> CallSpec<'_> {
        CallSpec {
            name: self.meta.name(),
            sql: &self.call_sql,
        }
    }

    fn log_failure(&self, mode: &str, err: DbError) -> DbError {
        error!(
            "event=procedure_call module=model status=error procedure={} mode={mode} error={err}",
            self.meta.name()
        );
        err
    }
}

fn decode_scalar(slot: usize, wire: WireType, value: Value) -> Result<Scalar, DbError> {
    let value = wire
        .coerce(value)
        .map_err(|found| DbError::TypeMismatch { slot, wire, found })?;

    Ok(match (wire, value) {
        (_, Value::Null) => Scalar::Other(Value::Null),
        (WireType::Integer, Value::Integer(v)) => {
            i32::try_from(v).map_or(Scalar::Long(v), Scalar::Integer)
        }
        (WireType::BigInt, Value::Integer(v)) => Scalar::Long(v),
        (WireType::Varchar | WireType::Char, Value::Text(v)) => Scalar::Text(v),
        (_, other) => Scalar::Other(other),
    })
}
