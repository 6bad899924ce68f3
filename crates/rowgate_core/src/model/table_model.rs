//! Table-backed model: generated SQL over one `TableMetaData`.
//!
//! # Responsibility
//! - Build statements from the table descriptor and bind them in
//!   placeholder order.
//! - Delegate body/row mapping to the entity's `RowProcessor`.
//!
//! # Invariants
//! - The key is bound as its own parameter with the primary-key wire type.
//! - Column list and bound values come from one pass over the same
//!   `ColumnValues`, so their orders match.

use crate::error::{ModelError, ModelResult};
use crate::meta::table::TableMetaData;
use crate::meta::wire::WireType;
use crate::model::options::ListOptions;
use crate::model::processor::RowProcessor;
use crate::model::values::ColumnValues;
use crate::model::{read_single, Model};
use crate::store::{BoundParam, Store};
use log::{debug, error};
use rusqlite::types::Value;
use std::io::Write;
use std::sync::Arc;

pub struct TableModel<S, P> {
    store: S,
    meta: TableMetaData,
    processor: Arc<P>,
}

impl<S: Store, P: RowProcessor> TableModel<S, P> {
    pub fn new(store: S, meta: TableMetaData, processor: P) -> Self {
        Self::with_shared_processor(store, meta, Arc::new(processor))
    }

    pub(crate) fn with_shared_processor(store: S, meta: TableMetaData, processor: Arc<P>) -> Self {
        Self {
            store,
            meta,
            processor,
        }
    }

    pub fn meta(&self) -> &TableMetaData {
        &self.meta
    }

    /// Inserts `body` letting the store assign `id`.
    pub fn create_with_generated_key(&self, body: &P::Body) -> ModelResult<usize> {
        let values = self.processor.body_to_columns(body)?;
        let sql = self.meta.gen_insert_sql(values.columns(), true)?;
        let params = self.column_params(&values, 1)?;
        self.run_update("table_insert", None, &sql, &params)
    }

    fn key_param(&self, slot: usize, key: &str) -> BoundParam {
        BoundParam::value(
            slot,
            Value::Text(key.to_string()),
            self.meta.pk_type().wire_type(),
        )
    }

    fn column_params(&self, values: &ColumnValues, first_slot: usize) -> ModelResult<Vec<BoundParam>> {
        values
            .iter()
            .enumerate()
            .map(|(offset, (column, value))| -> ModelResult<BoundParam> {
                let wire = self.meta.require_column(column)?;
                let slot = first_slot + offset;
                Ok(match value {
                    Value::Null => BoundParam::null(slot, wire),
                    other => BoundParam::value(slot, other.clone(), wire),
                })
            })
            .collect()
    }

    fn run_update(
        &self,
        event: &str,
        key: Option<&str>,
        sql: &str,
        params: &[BoundParam],
    ) -> ModelResult<usize> {
        let table = self.meta.table_name();
        let key = key.unwrap_or("-");
        debug!("event={event} module=model status=start table={table} key={key}");

        match self.store.execute_update(sql, params) {
            Ok(affected) => {
                debug!(
                    "event={event} module=model status=ok table={table} key={key} affected={affected}"
                );
                Ok(affected)
            }
            Err(err) => {
                error!(
                    "event={event} module=model status=error table={table} key={key} error_code=store_failed error={err}"
                );
                Err(err.into())
            }
        }
    }

    fn prepare_list(&self, options: &ListOptions) -> ModelResult<(String, Vec<BoundParam>)> {
        let resolved = options.resolve(&self.meta)?;
        let sql = self.meta.gen_paged_select_sql(
            Some(&resolved.filter),
            Some(resolved.sort.as_slice()),
            resolved.page,
        )?;

        let mut params: Vec<BoundParam> = resolved
            .filter
            .iter()
            .enumerate()
            .map(|(index, condition)| match condition.value() {
                Value::Null => BoundParam::null(index + 1, condition.wire()),
                value => BoundParam::value(index + 1, value.clone(), condition.wire()),
            })
            .collect();
        if let Some(limit) = resolved.page.limit {
            params.push(BoundParam::value(
                params.len() + 1,
                Value::Integer(i64::from(limit)),
                WireType::BigInt,
            ));
        }
        if resolved.page.offset > 0 {
            params.push(BoundParam::value(
                params.len() + 1,
                Value::Integer(i64::from(resolved.page.offset)),
                WireType::BigInt,
            ));
        }

        Ok((sql, params))
    }
}

impl<S: Store, P: RowProcessor> Model for TableModel<S, P> {
    type Body = P::Body;
    type List = P::List;

    fn create(&self, key: &str, body: &P::Body) -> ModelResult<usize> {
        let values = self.processor.body_to_columns(body)?;
        let sql = self.meta.gen_insert_sql(values.columns(), false)?;

        let mut params = vec![self.key_param(1, key)];
        params.extend(self.column_params(&values, 2)?);
        self.run_update("table_insert", Some(key), &sql, &params)
    }

    fn update(&self, key: &str, body: &P::Body) -> ModelResult<usize> {
        let values = self.processor.body_to_columns(body)?;
        let sql = self.meta.gen_update_sql(values.columns())?;

        let mut params = self.column_params(&values, 1)?;
        params.push(self.key_param(params.len() + 1, key));
        self.run_update("table_update", Some(key), &sql, &params)
    }

    fn delete(&self, key: &str) -> ModelResult<usize> {
        let sql = self.meta.gen_delete_sql();
        self.run_update("table_delete", Some(key), &sql, &[self.key_param(1, key)])
    }

    fn read(&self, key: &str) -> ModelResult<P::Body> {
        let sql = self.meta.gen_select_sql(false, None, None)?;
        debug!(
            "event=table_read module=model status=start table={} key={key}",
            self.meta.table_name()
        );
        self.store
            .execute_query(&sql, &[self.key_param(1, key)], |cursor| {
                read_single(self.processor.as_ref(), cursor, key)
            })
            .inspect_err(|err| {
                if !matches!(err, ModelError::NotFound { .. }) {
                    error!(
                        "event=table_read module=model status=error table={} key={key} error={err}",
                        self.meta.table_name()
                    );
                }
            })
    }

    fn list(&self, options: &ListOptions) -> ModelResult<P::List> {
        let (sql, params) = self.prepare_list(options)?;
        debug!(
            "event=table_list module=model status=start table={} params={}",
            self.meta.table_name(),
            params.len()
        );
        self.store
            .execute_query(&sql, &params, |cursor| self.processor.read_all(cursor))
    }

    fn list_to(&self, sink: &mut dyn Write, options: &ListOptions) -> ModelResult<usize> {
        let (sql, params) = self.prepare_list(options)?;
        debug!(
            "event=table_list_stream module=model status=start table={} params={}",
            self.meta.table_name(),
            params.len()
        );
        let written = self
            .store
            .execute_query(&sql, &params, |cursor| self.processor.write_rows(sink, cursor))?;
        debug!(
            "event=table_list_stream module=model status=ok table={} rows={written}",
            self.meta.table_name()
        );
        Ok(written)
    }
}
