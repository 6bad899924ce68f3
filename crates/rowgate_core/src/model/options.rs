//! List options: filter, order and paging directives.
//!
//! # Responsibility
//! - Carry list directives as a typed struct.
//! - Validate loosely-typed JSON options at the boundary.
//! - Resolve directives against a table definition before SQL is built.
//!
//! # Invariants
//! - `filter` entries are equality predicates.
//! - Resolution fails on the first column the table does not define.

use crate::error::{ModelError, ModelResult};
use crate::meta::filter::{Comparison, FilterCondition, FilterSet, SortField};
use crate::meta::table::{Page, TableMetaData};
use crate::model::json::json_to_value;
use crate::model::values::ColumnValues;
use rusqlite::types::Value;
use serde_json::Value as JsonValue;

const FILTER_KEY: &str = "filter";
const ORDER_KEY: &str = "order";
const LIMIT_KEY: &str = "limit";
const OFFSET_KEY: &str = "offset";

/// Directives for one list call. `Default` means "every active row".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Column -> value equality predicates.
    pub filter: Option<ColumnValues>,
    /// Sort tokens: `col`, `` `col` ``, optionally followed by `ASC`/`DESC`.
    pub order: Option<Vec<String>>,
    /// Additional non-equality predicates.
    pub conditions: Vec<(String, Comparison, Value)>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Options checked against a table: ready for SQL generation and binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedList {
    pub filter: FilterSet,
    pub sort: Vec<SortField>,
    pub page: Page,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.filter
            .get_or_insert_with(ColumnValues::new)
            .insert(column, value);
        self
    }

    pub fn with_condition(
        mut self,
        column: impl Into<String>,
        operator: Comparison,
        value: Value,
    ) -> Self {
        self.conditions.push((column.into(), operator, value));
        self
    }

    pub fn order_by(mut self, token: impl Into<String>) -> Self {
        self.order.get_or_insert_with(Vec::new).push(token.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Parses a loosely-typed options object.
    ///
    /// Recognized keys: `filter` (object of scalars), `order` (array of
    /// strings), `limit` and `offset` (non-negative integers). Absent or
    /// `null` keys mean "no constraint"; other keys are ignored.
    ///
    /// # Errors
    /// - `MalformedOptions` when a recognized key has the wrong shape.
    pub fn from_json(options: &JsonValue) -> ModelResult<Self> {
        let object = match options {
            JsonValue::Null => return Ok(Self::default()),
            JsonValue::Object(object) => object,
            other => {
                return Err(malformed(format!(
                    "options must be an object, got {}",
                    json_kind(other)
                )))
            }
        };

        let filter = match object.get(FILTER_KEY) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Object(entries)) => {
                let mut values = ColumnValues::new();
                for (column, value) in entries {
                    if value.is_array() || value.is_object() {
                        return Err(malformed(format!(
                            "`{FILTER_KEY}.{column}` must be a scalar, got {}",
                            json_kind(value)
                        )));
                    }
                    values.insert(column.clone(), json_to_value(value));
                }
                Some(values)
            }
            Some(other) => {
                return Err(malformed(format!(
                    "`{FILTER_KEY}` must be an object, got {}",
                    json_kind(other)
                )))
            }
        };

        let order = match object.get(ORDER_KEY) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Array(tokens)) => Some(
                tokens
                    .iter()
                    .map(|token| {
                        token.as_str().map(str::to_string).ok_or_else(|| {
                            malformed(format!(
                                "`{ORDER_KEY}` entries must be strings, got {}",
                                json_kind(token)
                            ))
                        })
                    })
                    .collect::<ModelResult<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(malformed(format!(
                    "`{ORDER_KEY}` must be an array, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(Self {
            filter,
            order,
            conditions: Vec::new(),
            limit: optional_u32(object.get(LIMIT_KEY), LIMIT_KEY)?,
            offset: optional_u32(object.get(OFFSET_KEY), OFFSET_KEY)?.unwrap_or(0),
        })
    }

    /// Checks every referenced column against `meta` and builds the filter
    /// set, sort fields and page in binding order.
    ///
    /// # Errors
    /// - `InvalidField` for unknown filter/condition/order columns or
    ///   malformed sort tokens.
    pub fn resolve(&self, meta: &TableMetaData) -> ModelResult<ResolvedList> {
        let mut filter = FilterSet::new();
        for (column, value) in self.filter.iter().flat_map(ColumnValues::iter) {
            let wire = meta.require_column(column)?;
            filter.insert(FilterCondition::new(column, Comparison::Eq, value.clone(), wire));
        }
        for (column, operator, value) in &self.conditions {
            let wire = meta.require_column(column)?;
            filter.insert(FilterCondition::new(column.as_str(), *operator, value.clone(), wire));
        }

        let mut sort = Vec::new();
        for token in self.order.iter().flatten() {
            let field = SortField::parse(meta.table_name(), token)?;
            meta.require_column(field.column())?;
            sort.push(field);
        }

        Ok(ResolvedList {
            filter,
            sort,
            page: Page {
                limit: self.limit,
                offset: self.offset,
            },
        })
    }
}

fn optional_u32(value: Option<&JsonValue>, key: &str) -> ModelResult<Option<u32>> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(number)) => number
            .as_u64()
            .and_then(|raw| u32::try_from(raw).ok())
            .map(Some)
            .ok_or_else(|| malformed(format!("`{key}` must be a non-negative 32-bit integer"))),
        Some(other) => Err(malformed(format!(
            "`{key}` must be a number, got {}",
            json_kind(other)
        ))),
    }
}

fn malformed(message: String) -> ModelError {
    ModelError::MalformedOptions(message)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
