//! Immutable descriptors for tables and stored procedures.
//!
//! # Responsibility
//! - Describe how an entity is persisted (table columns or procedure
//!   signatures) and render the statement text for it.
//! - Stay free of I/O: nothing here talks to a store.
//!
//! # Invariants
//! - Descriptors are validated on construction and never mutated after.
//! - Every identifier rendered into SQL matches `[A-Za-z_][A-Za-z0-9_]*`.

use crate::error::{ModelError, ModelResult};
use once_cell::sync::Lazy;
use regex::Regex;

pub mod filter;
pub mod procedure;
pub mod table;
pub mod wire;

/// Primary-key column every table carries.
pub const KEY_COLUMN: &str = "id";
/// Soft-delete marker column used when a table enables soft delete.
pub const DEACTIVATED_COLUMN: &str = "deactivated";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

pub(crate) fn ensure_identifier(value: &str) -> ModelResult<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(ModelError::InvalidIdentifier(value.to_string()))
    }
}
