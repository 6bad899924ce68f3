//! Error type reported by every model operation.
//!
//! # Invariants
//! - Each failure class maps to exactly one variant; callers branch on the
//!   variant, never on message text.
//! - Store failures keep their source error attached.

use crate::db::DbError;
use crate::model::Operation;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug)]
pub enum ModelError {
    /// Neither a procedure nor a table strategy is registered for the operation.
    Unconfigured(Operation),
    /// A body, filter or order column is not defined for the table.
    InvalidField { table: String, column: String },
    /// An update body projected to no columns.
    EmptyUpdate { table: String },
    /// Single-row read found nothing for the key.
    NotFound { key: String },
    /// List options had the wrong shape.
    MalformedOptions(String),
    /// A table, column or procedure name is not a plain SQL identifier.
    InvalidIdentifier(String),
    /// Entity configuration could not be read or is inconsistent.
    InvalidConfig(String),
    /// The row processor could not map a body or a row.
    Processor(String),
    /// The streaming sink rejected a write.
    Sink(std::io::Error),
    Db(DbError),
}

impl ModelError {
    pub(crate) fn invalid_field(table: &str, column: &str) -> Self {
        Self::InvalidField {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconfigured(operation) => write!(
                f,
                "no procedure or table configured for `{}`",
                operation.as_str()
            ),
            Self::InvalidField { table, column } => {
                write!(f, "Table `{table}` does not contain field `{column}`")
            }
            Self::EmptyUpdate { table } => {
                write!(f, "update of table `{table}` sets no columns")
            }
            Self::NotFound { key } => write!(f, "no data found for key `{key}`"),
            Self::MalformedOptions(message) => write!(f, "malformed list options: {message}"),
            Self::InvalidIdentifier(value) => write!(f, "invalid SQL identifier `{value}`"),
            Self::InvalidConfig(message) => write!(f, "invalid entity configuration: {message}"),
            Self::Processor(message) => write!(f, "row processing failed: {message}"),
            Self::Sink(err) => write!(f, "output sink failed: {err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sink(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ModelError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ModelError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
