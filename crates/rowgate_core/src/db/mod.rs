//! SQLite connection bootstrap and store-level errors.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by `SqliteStore`.
//! - Define the error type every `Store` implementation reports.
//!
//! # Invariants
//! - Store failures are wrapped, never swallowed or retried here.
//! - No schema is created or migrated by this module.

use crate::meta::wire::WireType;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure raised by the statement-execution layer.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A procedure call named a routine the store does not know.
    UnknownRoutine(String),
    /// A bound value could not be converted to the slot's wire type.
    TypeMismatch {
        slot: usize,
        wire: WireType,
        found: &'static str,
    },
    /// A function call finished without producing its output parameter.
    MissingOutput(usize),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnknownRoutine(name) => write!(f, "unknown routine `{name}`"),
            Self::TypeMismatch { slot, wire, found } => write!(
                f,
                "cannot bind {found} value at slot {slot} as {}",
                wire.as_str()
            ),
            Self::MissingOutput(slot) => {
                write!(f, "call produced no value for output slot {slot}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnknownRoutine(_) | Self::TypeMismatch { .. } | Self::MissingOutput(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
