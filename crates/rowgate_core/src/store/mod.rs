//! Statement-execution seam consumed by the models.
//!
//! # Responsibility
//! - Define how models hand parameterized statements and procedure calls to
//!   a backing store, and how rows come back.
//! - Ship a SQLite implementation (`SqliteStore`).
//!
//! # Invariants
//! - Cursors only live inside the reader closure; the store releases the
//!   statement when the closure returns, whether it succeeded or not.
//! - One call uses exactly one statement.

use crate::db::DbResult;
use crate::error::ModelResult;
use crate::meta::wire::WireType;
use rusqlite::types::Value;

mod sqlite;

pub use sqlite::SqliteStore;

/// How one slot is bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Value(Value, WireType),
    /// Explicit SQL `NULL` typed as `WireType`.
    Null(WireType),
    /// Output parameter registered for the call result.
    Out(WireType),
}

/// A bind directive for one one-based placeholder slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub slot: usize,
    pub bind: Bind,
}

impl BoundParam {
    pub fn value(slot: usize, value: Value, wire: WireType) -> Self {
        Self {
            slot,
            bind: Bind::Value(value, wire),
        }
    }

    pub fn null(slot: usize, wire: WireType) -> Self {
        Self {
            slot,
            bind: Bind::Null(wire),
        }
    }

    pub fn out(slot: usize, wire: WireType) -> Self {
        Self {
            slot,
            bind: Bind::Out(wire),
        }
    }
}

/// Column names of a result set, in result order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMetadata {
    names: Vec<String>,
}

impl ColumnMetadata {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn column_count(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// One materialized result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Forward-only row cursor handed to readers.
pub trait RowCursor {
    fn metadata(&self) -> &ColumnMetadata;
    fn next_row(&mut self) -> DbResult<Option<Row>>;
}

/// Cursor over rows already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryCursor {
    metadata: ColumnMetadata,
    rows: std::vec::IntoIter<Row>,
}

impl MemoryCursor {
    pub fn new(metadata: ColumnMetadata, rows: Vec<Row>) -> Self {
        Self {
            metadata,
            rows: rows.into_iter(),
        }
    }
}

impl RowCursor for MemoryCursor {
    fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        Ok(self.rows.next())
    }
}

/// Identifies a procedure call: routine name plus generated call text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSpec<'a> {
    pub name: &'a str,
    pub sql: &'a str,
}

/// Result of a call executed without a result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOutcome {
    /// Rows changed as reported by the store.
    pub affected: usize,
    /// Values of registered output slots.
    pub outputs: Vec<(usize, Value)>,
}

impl CallOutcome {
    pub fn output(&self, slot: usize) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|(position, _)| *position == slot)
            .map(|(_, value)| value)
    }
}

/// Backing store able to run statements and procedure calls.
pub trait Store {
    /// Runs an INSERT/UPDATE/DELETE and returns the affected-row count.
    fn execute_update(&self, sql: &str, params: &[BoundParam]) -> DbResult<usize>;

    /// Runs a query and lends its cursor to `read`.
    fn execute_query<T, F>(&self, sql: &str, params: &[BoundParam], read: F) -> ModelResult<T>
    where
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>;

    /// Runs a procedure call that yields no result set.
    fn execute_call(&self, call: &CallSpec<'_>, params: &[BoundParam]) -> DbResult<CallOutcome>;

    /// Runs a procedure call and lends its result cursor to `read`.
    fn execute_call_query<T, F>(
        &self,
        call: &CallSpec<'_>,
        params: &[BoundParam],
        read: F,
    ) -> ModelResult<T>
    where
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>;
}

impl<S: Store> Store for &S {
    fn execute_update(&self, sql: &str, params: &[BoundParam]) -> DbResult<usize> {
        (**self).execute_update(sql, params)
    }

    fn execute_query<T, F>(&self, sql: &str, params: &[BoundParam], read: F) -> ModelResult<T>
    where
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>,
    {
        (**self).execute_query(sql, params, read)
    }

    fn execute_call(&self, call: &CallSpec<'_>, params: &[BoundParam]) -> DbResult<CallOutcome> {
        (**self).execute_call(call, params)
    }

    fn execute_call_query<T, F>(
        &self,
        call: &CallSpec<'_>,
        params: &[BoundParam],
        read: F,
    ) -> ModelResult<T>
    where
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>,
    {
        (**self).execute_call_query(call, params, read)
    }
}
