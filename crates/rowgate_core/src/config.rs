//! Entity configuration loaded from JSON.
//!
//! # Responsibility
//! - Describe one entity's table and procedure bindings as plain data.
//! - Turn that data into validated descriptors and a wired `ApiModel`.
//!
//! # Invariants
//! - Unknown keys are rejected so typos surface at load time.
//! - Validation is delegated to `TableMetaData::new`/`ProcMetaData::new`;
//!   this module never builds a descriptor those constructors would refuse.

use crate::error::{ModelError, ModelResult};
use crate::meta::procedure::ProcMetaData;
use crate::meta::table::TableMetaData;
use crate::meta::wire::{PrimaryKeyType, WireType};
use crate::model::api_model::ApiModel;
use crate::model::processor::RowProcessor;
use crate::model::Operation;
use crate::store::Store;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One entity: an optional table plus optional per-operation procedures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    #[serde(default)]
    pub table: Option<TableConfig>,
    #[serde(default)]
    pub procedures: ProcedureConfigs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,
    pub columns: Vec<ColumnConfig>,
    #[serde(default = "default_primary_key")]
    pub primary_key: PrimaryKeyType,
    #[serde(default)]
    pub soft_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub wire: WireType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcedureConfigs {
    #[serde(default)]
    pub insert: Option<ProcedureConfig>,
    #[serde(default)]
    pub update: Option<ProcedureConfig>,
    #[serde(default)]
    pub delete: Option<ProcedureConfig>,
    #[serde(default)]
    pub read: Option<ProcedureConfig>,
    #[serde(default)]
    pub list: Option<ProcedureConfig>,
}

impl ProcedureConfigs {
    pub fn get(&self, operation: Operation) -> Option<&ProcedureConfig> {
        match operation {
            Operation::Insert => self.insert.as_ref(),
            Operation::Update => self.update.as_ref(),
            Operation::Delete => self.delete.as_ref(),
            Operation::Read => self.read.as_ref(),
            Operation::List => self.list.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcedureConfig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ColumnConfig>,
    #[serde(default)]
    pub returns: Option<WireType>,
}

impl ProcedureConfig {
    pub fn to_meta(&self) -> ModelResult<ProcMetaData> {
        ProcMetaData::new(
            self.name.as_str(),
            self.params
                .iter()
                .map(|param| (param.name.as_str(), param.wire)),
            self.returns,
        )
    }
}

fn default_primary_key() -> PrimaryKeyType {
    PrimaryKeyType::Varchar
}

impl EntityConfig {
    /// Parses a JSON entity configuration.
    ///
    /// # Errors
    /// - `InvalidConfig` when the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> ModelResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| ModelError::InvalidConfig(format!("invalid entity config: {err}")))
    }

    /// Reads and parses a JSON entity configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            error!(
                "event=config_load module=config status=error path={} error={err}",
                path.display()
            );
            ModelError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        let config = Self::from_json_str(&text)?;
        info!(
            "event=config_load module=config status=ok path={} table={}",
            path.display(),
            config.table.as_ref().map_or("-", |table| table.name.as_str())
        );
        Ok(config)
    }

    /// Validated table descriptor, when a table is configured.
    pub fn table_meta(&self) -> ModelResult<Option<TableMetaData>> {
        self.table
            .as_ref()
            .map(|table| {
                TableMetaData::new(
                    table.name.as_str(),
                    table
                        .columns
                        .iter()
                        .map(|column| (column.name.as_str(), column.wire)),
                    table.primary_key,
                    table.soft_delete,
                )
            })
            .transpose()
    }

    /// Validated procedure descriptors in operation order.
    pub fn procedures(&self) -> ModelResult<Vec<(Operation, ProcMetaData)>> {
        Operation::ALL
            .into_iter()
            .filter_map(|operation| {
                self.procedures
                    .get(operation)
                    .map(|config| config.to_meta().map(|meta| (operation, meta)))
            })
            .collect()
    }

    /// Builds a model with the configured table and every configured
    /// procedure registered.
    pub fn build_api_model<S, P>(&self, store: S, processor: P) -> ModelResult<ApiModel<S, P>>
    where
        S: Store + Clone,
        P: RowProcessor,
    {
        let procedures = self.procedures()?;
        let mut model = match self.table_meta()? {
            Some(meta) => ApiModel::with_table(store, processor, meta),
            None => ApiModel::new(store, processor),
        };
        for (operation, meta) in procedures {
            model.register_procedure(operation, meta);
        }
        Ok(model)
    }
}
