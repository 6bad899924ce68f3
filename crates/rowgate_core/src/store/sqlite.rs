//! SQLite-backed `Store`.
//!
//! # Responsibility
//! - Bind `BoundParam` slots onto prepared `rusqlite` statements.
//! - Emulate stored procedures with named SQL routines, since SQLite has no
//!   `CALL`.
//!
//! # Invariants
//! - Values are coerced to the slot's wire type before binding.
//! - Routine inputs bind to placeholders `1..n` in declaration order; output
//!   slots take no placeholder.
//! - Routines are registered before the store is shared and never change
//!   afterwards.

use super::{Bind, BoundParam, CallOutcome, CallSpec, ColumnMetadata, Row, RowCursor, Store};
use crate::db::{DbError, DbResult};
use crate::error::ModelResult;
use log::trace;
use rusqlite::types::Value;
use rusqlite::{Connection, Rows, Statement};
use std::collections::BTreeMap;
use std::sync::Arc;

/// `Store` over a borrowed SQLite connection.
#[derive(Debug, Clone)]
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
    routines: Arc<BTreeMap<String, String>>,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            routines: Arc::new(BTreeMap::new()),
        }
    }

    /// Registers `sql` as the body of routine `name`.
    ///
    /// The body addresses call inputs as `?1..?n` (or bare `?`) in the
    /// procedure's declaration order. For function calls the first column of
    /// the first result row becomes the output value.
    pub fn with_routine(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.routines).insert(name.into(), sql.into());
        self
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn routine(&self, name: &str) -> DbResult<&str> {
        self.routines
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DbError::UnknownRoutine(name.to_string()))
    }
}

impl Store for SqliteStore<'_> {
    fn execute_update(&self, sql: &str, params: &[BoundParam]) -> DbResult<usize> {
        trace!("event=store_update module=store status=start sql={sql}");
        let mut stmt = self.conn.prepare(sql)?;
        bind_statement(&mut stmt, params)?;
        Ok(stmt.raw_execute()?)
    }

    fn execute_query<T, F>(&self, sql: &str, params: &[BoundParam], read: F) -> ModelResult<T>
    where
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>,
    {
        trace!("event=store_query module=store status=start sql={sql}");
        let mut stmt = self.conn.prepare(sql)?;
        bind_statement(&mut stmt, params)?;
        let metadata = column_metadata(&stmt);
        let mut cursor = SqliteCursor {
            rows: stmt.raw_query(),
            metadata,
        };
        read(&mut cursor)
    }

    fn execute_call(&self, call: &CallSpec<'_>, params: &[BoundParam]) -> DbResult<CallOutcome> {
        trace!(
            "event=store_call module=store status=start routine={} call={}",
            call.name,
            call.sql
        );
        let mut stmt = self.conn.prepare(self.routine(call.name)?)?;
        bind_call_inputs(&mut stmt, params)?;

        let output_slots: Vec<usize> = params
            .iter()
            .filter(|param| matches!(param.bind, Bind::Out(_)))
            .map(|param| param.slot)
            .collect();
        if output_slots.is_empty() {
            let affected = stmt.raw_execute()?;
            return Ok(CallOutcome {
                affected,
                outputs: Vec::new(),
            });
        }

        let mut rows = stmt.raw_query();
        let row = rows
            .next()?
            .ok_or(DbError::MissingOutput(output_slots[0]))?;
        let mut outputs = Vec::with_capacity(output_slots.len());
        for (index, slot) in output_slots.into_iter().enumerate() {
            let value: Value = row.get(index).map_err(|_| DbError::MissingOutput(slot))?;
            outputs.push((slot, value));
        }

        Ok(CallOutcome {
            affected: 0,
            outputs,
        })
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
        trace!(
            "event=store_call_query module=store status=start routine={} call={}",
            call.name,
            call.sql
        );
        let mut stmt = self.conn.prepare(self.routine(call.name)?)?;
        bind_call_inputs(&mut stmt, params)?;
        let metadata = column_metadata(&stmt);
        let mut cursor = SqliteCursor {
            rows: stmt.raw_query(),
            metadata,
        };
        read(&mut cursor)
    }
}

struct SqliteCursor<'stmt> {
    rows: Rows<'stmt>,
    metadata: ColumnMetadata,
}

impl RowCursor for SqliteCursor<'_> {
    fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        let count = self.metadata.column_count();
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };

        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            values.push(row.get::<_, Value>(index)?);
        }
        Ok(Some(Row::new(values)))
    }
}

fn column_metadata(stmt: &Statement<'_>) -> ColumnMetadata {
    ColumnMetadata::new(
        stmt.column_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

fn bind_statement(stmt: &mut Statement<'_>, params: &[BoundParam]) -> DbResult<()> {
    for param in params {
        bind_one(stmt, param.slot, param)?;
    }
    Ok(())
}

fn bind_call_inputs(stmt: &mut Statement<'_>, params: &[BoundParam]) -> DbResult<()> {
    for param in params {
        let outputs_before = params
            .iter()
            .filter(|other| other.slot < param.slot && matches!(other.bind, Bind::Out(_)))
            .count();
        bind_one(stmt, param.slot - outputs_before, param)?;
    }
    Ok(())
}

fn bind_one(stmt: &mut Statement<'_>, position: usize, param: &BoundParam) -> DbResult<()> {
    match &param.bind {
        Bind::Value(value, wire) => {
            let coerced = wire
                .coerce(value.clone())
                .map_err(|found| DbError::TypeMismatch {
                    slot: param.slot,
                    wire: *wire,
                    found,
                })?;
            stmt.raw_bind_parameter(position, coerced)?;
        }
        Bind::Null(_) => stmt.raw_bind_parameter(position, Value::Null)?,
        Bind::Out(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::db::DbError;
    use crate::error::ModelError;
    use crate::meta::wire::WireType;
    use crate::store::{BoundParam, CallSpec, Store};
    use rusqlite::types::Value;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER);")
            .unwrap();
        conn
    }

    #[test]
    fn update_coerces_values_to_wire_type() {
        let conn = conn();
        let store = SqliteStore::new(&conn);

        let affected = store
            .execute_update(
                "INSERT INTO t (id, n) VALUES (?, ?)",
                &[
                    BoundParam::value(1, Value::Text("a".to_string()), WireType::Varchar),
                    BoundParam::value(2, Value::Text("12".to_string()), WireType::Integer),
                ],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let n: i64 = conn
            .query_row("SELECT n FROM t WHERE id = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 12);
    }

    #[test]
    fn update_reports_type_mismatch_with_slot() {
        let conn = conn();
        let store = SqliteStore::new(&conn);

        let err = store
            .execute_update(
                "INSERT INTO t (id, n) VALUES (?, ?)",
                &[
                    BoundParam::value(1, Value::Text("a".to_string()), WireType::Varchar),
                    BoundParam::value(2, Value::Text("twelve".to_string()), WireType::Integer),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { slot: 2, found: "text", .. }));
    }

    #[test]
    fn query_lends_cursor_with_column_names() {
        let conn = conn();
        conn.execute_batch("INSERT INTO t VALUES ('a', 1), ('b', 2);")
            .unwrap();
        let store = SqliteStore::new(&conn);

        let (names, rows) = store
            .execute_query("SELECT id, n FROM t ORDER BY id", &[], |cursor| {
                let names = cursor.metadata().names().to_vec();
                let mut rows = Vec::new();
                while let Some(row) = cursor.next_row()? {
                    rows.push(row.into_values());
                }
                Ok((names, rows))
            })
            .unwrap();

        assert_eq!(names, vec!["id".to_string(), "n".to_string()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![Value::Text("b".to_string()), Value::Integer(2)]);
    }

    #[test]
    fn function_routine_fills_output_slot_and_shifts_inputs() {
        let conn = conn();
        conn.execute_batch("INSERT INTO t VALUES ('a', 1), ('b', 5);")
            .unwrap();
        let store = SqliteStore::new(&conn).with_routine("count_above", "SELECT COUNT(*) FROM t WHERE n > ?1");

        let outcome = store
            .execute_call(
                &CallSpec {
                    name: "count_above",
                    sql: "? = CALL count_above(?)",
                },
                &[
                    BoundParam::out(1, WireType::Integer),
                    BoundParam::value(2, Value::Integer(2), WireType::Integer),
                ],
            )
            .unwrap();
        assert_eq!(outcome.output(1), Some(&Value::Integer(1)));
    }

    #[test]
    fn unknown_routine_fails_before_execution() {
        let conn = conn();
        let store = SqliteStore::new(&conn);

        let err = store
            .execute_call_query(
                &CallSpec {
                    name: "missing",
                    sql: "CALL missing()",
                },
                &[],
                |_| Ok(()),
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::Db(DbError::UnknownRoutine(ref name)) if name == "missing"));
    }
}
