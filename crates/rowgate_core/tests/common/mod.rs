#![allow(dead_code)]

use rowgate_core::db::DbResult;
use rowgate_core::store::{
    BoundParam, CallOutcome, CallSpec, ColumnMetadata, MemoryCursor, Row, RowCursor,
};
use rowgate_core::{ModelResult, Store};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const EMPLOYEES_DDL: &str = "CREATE TABLE employees (
    id TEXT PRIMARY KEY,
    empcode INTEGER,
    loginname TEXT,
    deactivated INTEGER NOT NULL DEFAULT 0
)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub empcode: i64,
    pub loginname: String,
}

impl Employee {
    pub fn new(empcode: i64, loginname: &str) -> Self {
        Self {
            id: None,
            empcode,
            loginname: loginname.to_string(),
        }
    }
}

pub fn employees_db() -> Connection {
    let conn = rowgate_core::open_db_in_memory().unwrap();
    conn.execute(EMPLOYEES_DDL, []).unwrap();
    conn
}

/// One statement or call seen by `RecordingStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: &'static str,
    pub sql: String,
    pub params: Vec<BoundParam>,
}

/// Fake store that records every request and answers with canned results.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub affected: usize,
    pub outputs: Vec<(usize, Value)>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub calls: Mutex<Vec<Recorded>>,
}

impl RecordingStore {
    pub fn with_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|name| name.to_string()).collect(),
            rows,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, sql: &str, params: &[BoundParam]) {
        self.calls.lock().unwrap().push(Recorded {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    fn cursor(&self) -> MemoryCursor {
        MemoryCursor::new(
            ColumnMetadata::new(self.columns.clone()),
            self.rows.iter().cloned().map(Row::new).collect(),
        )
    }
}

impl Store for RecordingStore {
    fn execute_update(&self, sql: &str, params: &[BoundParam]) -> DbResult<usize> {
        self.record("update", sql, params);
        Ok(self.affected)
    }

    fn execute_query<T, F>(&self, sql: &str, params: &[BoundParam], read: F) -> ModelResult<T>
    where
        F: FnOnce(&mut dyn RowCursor) -> ModelResult<T>,
    {
        self.record("query", sql, params);
        read(&mut self.cursor())
    }

    fn execute_call(&self, call: &CallSpec<'_>, params: &[BoundParam]) -> DbResult<CallOutcome> {
        self.record("call", call.sql, params);
        Ok(CallOutcome {
            affected: self.affected,
            outputs: self.outputs.clone(),
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
        self.record("call_query", call.sql, params);
        read(&mut self.cursor())
    }
}
