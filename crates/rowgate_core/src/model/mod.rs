//! Entity models: the uniform CRUD/list contract and its strategies.
//!
//! # Responsibility
//! - Define the `Model` contract every entity exposes.
//! - Provide the table-backed strategy (`TableModel`), procedure invocation
//!   (`Procedure`) and the per-operation dispatcher (`ApiModel`).
//!
//! # Invariants
//! - Invalid columns and malformed options fail before any statement runs.
//! - A zero-row update/delete is reported as `0`, a zero-row read as
//!   `ModelError::NotFound`, a zero-row list as an empty result.

use crate::error::{ModelError, ModelResult};
use crate::store::RowCursor;
use std::io::Write;

pub mod api_model;
pub mod json;
pub mod options;
pub mod procedure;
pub mod processor;
pub mod table_model;
pub mod values;

/// Argument name the entity key is injected under for procedure calls.
pub const KEY_ARG: &str = "key";

/// The five operations a model dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Read,
    List,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
        Operation::Read,
        Operation::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Read => "read",
            Self::List => "list",
        }
    }
}

/// Uniform CRUD/list contract for one entity type.
pub trait Model {
    type Body;
    type List;

    /// Inserts `body` under `key`; returns the affected-row count.
    fn create(&self, key: &str, body: &Self::Body) -> ModelResult<usize>;
    /// Updates the active row for `key`; `0` means no such row.
    fn update(&self, key: &str, body: &Self::Body) -> ModelResult<usize>;
    /// Deletes (or deactivates) the row for `key`; `0` means no such row.
    fn delete(&self, key: &str) -> ModelResult<usize>;
    /// Reads one row; fails with `NotFound` when there is none.
    fn read(&self, key: &str) -> ModelResult<Self::Body>;
    fn list(&self, options: &options::ListOptions) -> ModelResult<Self::List>;
    /// Streams matching rows into `sink`; returns the number of rows written.
    fn list_to(&self, sink: &mut dyn Write, options: &options::ListOptions)
        -> ModelResult<usize>;
}

pub(crate) fn read_single<P: processor::RowProcessor>(
    processor: &P,
    cursor: &mut dyn RowCursor,
    key: &str,
) -> ModelResult<P::Body> {
    match cursor.next_row()? {
        Some(row) => processor.read_row(&row, cursor.metadata()),
        None => Err(ModelError::NotFound {
            key: key.to_string(),
        }),
    }
}
