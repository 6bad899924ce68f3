//! Per-operation dispatch between stored procedures and the table model.
//!
//! # Responsibility
//! - Resolve, per operation, whether a registered procedure, the table
//!   model, or nothing serves the call.
//! - Adapt procedure results to the uniform `Model` contract.
//!
//! # Invariants
//! - A registered procedure always wins over the table model.
//! - Strategies change only through `&mut self` registration, never per call.
//! - Procedure create/update use the same body projection as the table
//!   model, with the key injected under `KEY_ARG`.
//! - A procedure list receives only the filter entries; order, conditions
//!   and paging are rejected before the call.

use crate::db::DbError;
use crate::error::{ModelError, ModelResult};
use crate::meta::procedure::ProcMetaData;
use crate::meta::table::TableMetaData;
use crate::model::options::ListOptions;
use crate::model::procedure::Procedure;
use crate::model::processor::RowProcessor;
use crate::model::table_model::TableModel;
use crate::model::values::ColumnValues;
use crate::model::{read_single, Model, Operation, KEY_ARG};
use crate::store::Store;
use log::debug;
use rusqlite::types::Value;
use std::io::Write;
use std::sync::Arc;
use uuid::Uuid;

/// How one operation is served.
#[derive(Debug, Clone)]
pub enum OperationStrategy {
    Procedure(Procedure),
    Table,
    Unconfigured,
}

impl OperationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Procedure(_) => "procedure",
            Self::Table => "table",
            Self::Unconfigured => "unconfigured",
        }
    }
}

#[derive(Debug, Clone)]
struct Strategies {
    insert: OperationStrategy,
    update: OperationStrategy,
    delete: OperationStrategy,
    read: OperationStrategy,
    list: OperationStrategy,
}

impl Strategies {
    fn uniform(strategy: OperationStrategy) -> Self {
        Self {
            insert: strategy.clone(),
            update: strategy.clone(),
            delete: strategy.clone(),
            read: strategy.clone(),
            list: strategy,
        }
    }

    fn get(&self, operation: Operation) -> &OperationStrategy {
        match operation {
            Operation::Insert => &self.insert,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
            Operation::Read => &self.read,
            Operation::List => &self.list,
        }
    }

    fn get_mut(&mut self, operation: Operation) -> &mut OperationStrategy {
        match operation {
            Operation::Insert => &mut self.insert,
            Operation::Update => &mut self.update,
            Operation::Delete => &mut self.delete,
            Operation::Read => &mut self.read,
            Operation::List => &mut self.list,
        }
    }
}

/// Entity facade dispatching each operation to a procedure or the table.
pub struct ApiModel<S, P> {
    store: S,
    processor: Arc<P>,
    table: Option<TableModel<S, P>>,
    strategies: Strategies,
}

impl<S: Store + Clone, P: RowProcessor> ApiModel<S, P> {
    /// Procedure-only model; every operation starts unconfigured.
    pub fn new(store: S, processor: P) -> Self {
        Self {
            store,
            processor: Arc::new(processor),
            table: None,
            strategies: Strategies::uniform(OperationStrategy::Unconfigured),
        }
    }

    /// Table-backed model; every operation starts on the table strategy.
    pub fn with_table(store: S, processor: P, meta: TableMetaData) -> Self {
        let processor = Arc::new(processor);
        let table = TableModel::with_shared_processor(store.clone(), meta, Arc::clone(&processor));
        Self {
            store,
            processor,
            table: Some(table),
            strategies: Strategies::uniform(OperationStrategy::Table),
        }
    }

    /// Routes `operation` through the procedure described by `meta`.
    pub fn register_procedure(&mut self, operation: Operation, meta: ProcMetaData) {
        debug!(
            "event=procedure_register module=model status=ok operation={} procedure={}",
            operation.as_str(),
            meta.name()
        );
        *self.strategies.get_mut(operation) = OperationStrategy::Procedure(Procedure::new(meta));
    }

    pub fn strategy(&self, operation: Operation) -> &OperationStrategy {
        self.strategies.get(operation)
    }

    pub fn table_model(&self) -> Option<&TableModel<S, P>> {
        self.table.as_ref()
    }

    /// Creates `body` under a freshly minted UUID v4 key and returns the key.
    pub fn create_generated(&self, body: &P::Body) -> ModelResult<String> {
        let key = Uuid::new_v4().to_string();
        self.create(&key, body)?;
        Ok(key)
    }

    fn dispatch(&self, operation: Operation) -> ModelResult<Route<'_, S, P>> {
        let strategy = self.strategies.get(operation);
        debug!(
            "event=api_dispatch module=model status=start operation={} strategy={}",
            operation.as_str(),
            strategy.as_str()
        );
        match strategy {
            OperationStrategy::Procedure(procedure) => Ok(Route::Procedure(procedure)),
            OperationStrategy::Table => self
                .table
                .as_ref()
                .map(Route::Table)
                .ok_or(ModelError::Unconfigured(operation)),
            OperationStrategy::Unconfigured => Err(ModelError::Unconfigured(operation)),
        }
    }

    fn body_args(&self, key: &str, body: &P::Body) -> ModelResult<ColumnValues> {
        let mut args = self.processor.body_to_columns(body)?;
        args.insert(KEY_ARG, Value::Text(key.to_string()));
        Ok(args)
    }

    /// Affected count of a procedure call: the function result when a
    /// return type is declared, else the store's reported count.
    fn call_for_count(&self, procedure: &Procedure, args: &ColumnValues) -> ModelResult<usize> {
        let Some(wire) = procedure.meta().return_type() else {
            return procedure.execute_procedure(&self.store, Some(args));
        };

        let scalar = procedure.execute_function(&self.store, Some(args))?;
        scalar
            .as_ref()
            .and_then(|scalar| scalar.as_count())
            .ok_or_else(|| {
                ModelError::Db(DbError::TypeMismatch {
                    slot: 1,
                    wire,
                    found: "non-count result",
                })
            })
    }
}

enum Route<'a, S, P> {
    Procedure(&'a Procedure),
    Table(&'a TableModel<S, P>),
}

fn procedure_list_args(options: &ListOptions) -> ModelResult<Option<&ColumnValues>> {
    let mut unsupported = Vec::new();
    if options.order.as_ref().is_some_and(|order| !order.is_empty()) {
        unsupported.push("order");
    }
    if !options.conditions.is_empty() {
        unsupported.push("conditions");
    }
    if options.limit.is_some() {
        unsupported.push("limit");
    }
    if options.offset > 0 {
        unsupported.push("offset");
    }
    if !unsupported.is_empty() {
        return Err(ModelError::MalformedOptions(format!(
            "procedure lists accept only `filter`; got {}",
            unsupported.join(", ")
        )));
    }
    Ok(options.filter.as_ref())
}

fn key_args(key: &str) -> ColumnValues {
    [(KEY_ARG, Value::Text(key.to_string()))]
        .into_iter()
        .collect()
}

impl<S: Store + Clone, P: RowProcessor> Model for ApiModel<S, P> {
    type Body = P::Body;
    type List = P::List;

    fn create(&self, key: &str, body: &P::Body) -> ModelResult<usize> {
        match self.dispatch(Operation::Insert)? {
            Route::Procedure(procedure) => self.call_for_count(procedure, &self.body_args(key, body)?),
            Route::Table(table) => table.create(key, body),
        }
    }

    fn update(&self, key: &str, body: &P::Body) -> ModelResult<usize> {
        match self.dispatch(Operation::Update)? {
            Route::Procedure(procedure) => self.call_for_count(procedure, &self.body_args(key, body)?),
            Route::Table(table) => table.update(key, body),
        }
    }

    fn delete(&self, key: &str) -> ModelResult<usize> {
        match self.dispatch(Operation::Delete)? {
            Route::Procedure(procedure) => self.call_for_count(procedure, &key_args(key)),
            Route::Table(table) => table.delete(key),
        }
    }

    fn read(&self, key: &str) -> ModelResult<P::Body> {
        match self.dispatch(Operation::Read)? {
            Route::Procedure(procedure) => {
                procedure.execute_query(&self.store, Some(&key_args(key)), |cursor| {
                    read_single(self.processor.as_ref(), cursor, key)
                })
            }
            Route::Table(table) => table.read(key),
        }
    }

    fn list(&self, options: &ListOptions) -> ModelResult<P::List> {
        match self.dispatch(Operation::List)? {
            Route::Procedure(procedure) => {
                let args = procedure_list_args(options)?;
                procedure.execute_query(&self.store, args, |cursor| {
                    self.processor.read_all(cursor)
                })
            }
            Route::Table(table) => table.list(options),
        }
    }

    fn list_to(&self, sink: &mut dyn Write, options: &ListOptions) -> ModelResult<usize> {
        match self.dispatch(Operation::List)? {
            Route::Procedure(procedure) => {
                let args = procedure_list_args(options)?;
                procedure.execute_query(&self.store, args, |cursor| {
                    self.processor.write_rows(sink, cursor)
                })
            }
            Route::Table(table) => table.list_to(sink, options),
        }
    }
}
