//! Row processors: per-entity mapping between bodies, column values and rows.

use crate::error::{ModelError, ModelResult};
use crate::meta::KEY_COLUMN;
use crate::model::json::{json_to_value, row_to_object};
use crate::model::values::ColumnValues;
use crate::store::{ColumnMetadata, Row, RowCursor};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::marker::PhantomData;

/// Type-specific mapping consumed by the models.
pub trait RowProcessor {
    type Body;
    type List;

    /// Projects a body onto column values, in the order they should bind.
    fn body_to_columns(&self, body: &Self::Body) -> ModelResult<ColumnValues>;

    fn read_row(&self, row: &Row, metadata: &ColumnMetadata) -> ModelResult<Self::Body>;

    /// Materializes every remaining row.
    fn read_all(&self, cursor: &mut dyn RowCursor) -> ModelResult<Self::List>;

    /// Writes every remaining row to `sink`; returns the rows written.
    fn write_rows(&self, sink: &mut dyn Write, cursor: &mut dyn RowCursor) -> ModelResult<usize>;
}

/// Processor for any serde type, going through JSON objects.
///
/// - Bodies must serialize to a JSON object; its `id` field is dropped.
/// - Rows become objects keyed by column name before deserializing.
/// - Streaming writes a JSON array of row objects.
pub struct JsonRowProcessor<T> {
    _body: PhantomData<fn() -> T>,
}

impl<T> JsonRowProcessor<T> {
    pub fn new() -> Self {
        Self { _body: PhantomData }
    }
}

impl<T> Default for JsonRowProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> RowProcessor for JsonRowProcessor<T> {
    type Body = T;
    type List = Vec<T>;

    fn body_to_columns(&self, body: &T) -> ModelResult<ColumnValues> {
        let json =
            serde_json::to_value(body).map_err(|err| ModelError::Processor(err.to_string()))?;
        let JsonValue::Object(fields) = json else {
            return Err(ModelError::Processor(
                "body must serialize to a JSON object".to_string(),
            ));
        };

        Ok(fields
            .iter()
            .filter(|(name, _)| name.as_str() != KEY_COLUMN)
            .map(|(name, value)| (name.clone(), json_to_value(value)))
            .collect())
    }

    fn read_row(&self, row: &Row, metadata: &ColumnMetadata) -> ModelResult<T> {
        let object = row_to_object(row, metadata);
        serde_json::from_value(JsonValue::Object(object))
            .map_err(|err| ModelError::Processor(err.to_string()))
    }

    fn read_all(&self, cursor: &mut dyn RowCursor) -> ModelResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(row) = cursor.next_row()? {
            items.push(self.read_row(&row, cursor.metadata())?);
        }
        Ok(items)
    }

    fn write_rows(&self, sink: &mut dyn Write, cursor: &mut dyn RowCursor) -> ModelResult<usize> {
        sink.write_all(b"[").map_err(ModelError::Sink)?;

        let mut written = 0;
        while let Some(row) = cursor.next_row()? {
            if written > 0 {
                sink.write_all(b",").map_err(ModelError::Sink)?;
            }
            let object = JsonValue::Object(row_to_object(&row, cursor.metadata()));
            serde_json::to_writer(&mut *sink, &object)
                .map_err(|err| ModelError::Sink(err.into()))?;
            written += 1;
        }

        sink.write_all(b"]").map_err(ModelError::Sink)?;
        sink.flush().map_err(ModelError::Sink)?;
        Ok(written)
    }
}
