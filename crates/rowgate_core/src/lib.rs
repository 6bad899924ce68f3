//! Generic data-access core: one CRUD/list contract over generated table
//! SQL or stored-procedure calls.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod meta;
pub mod model;
pub mod store;

pub use config::EntityConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::{ModelError, ModelResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use meta::filter::{Comparison, FilterCondition, FilterSet, SortDirection, SortField};
pub use meta::procedure::{assign_slots, ProcMetaData, ProcParam, Slot, SlotRole};
pub use meta::table::{Page, TableMetaData};
pub use meta::wire::{PrimaryKeyType, WireType};
pub use model::api_model::{ApiModel, OperationStrategy};
pub use model::options::ListOptions;
pub use model::procedure::{Procedure, Scalar};
pub use model::processor::{JsonRowProcessor, RowProcessor};
pub use model::table_model::TableModel;
pub use model::values::ColumnValues;
pub use model::{Model, Operation};
pub use store::{SqliteStore, Store};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
