//! Stored-procedure descriptors and call slot assignment.
//!
//! # Invariants
//! - A return type, when present, always owns slot 1 as an output parameter.
//! - Declared inputs follow in declaration order, one slot each.

use crate::error::{ModelError, ModelResult};
use crate::meta::ensure_identifier;
use crate::meta::wire::WireType;

/// One declared input parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcParam {
    pub name: String,
    pub wire: WireType,
}

/// What occupies one call slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRole {
    /// Output parameter carrying the function result.
    Return(WireType),
    /// Input bound from the argument named `name`.
    Input { name: String, wire: WireType },
}

/// One-based call slot and its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub position: usize,
    pub role: SlotRole,
}

/// Computes the full slot map for a call.
pub fn assign_slots(return_type: Option<WireType>, params: &[ProcParam]) -> Vec<Slot> {
    let returns = return_type.map(SlotRole::Return);
    let inputs = params.iter().map(|param| SlotRole::Input {
        name: param.name.clone(),
        wire: param.wire,
    });

    returns
        .into_iter()
        .chain(inputs)
        .enumerate()
        .map(|(index, role)| Slot {
            position: index + 1,
            role,
        })
        .collect()
}

/// Immutable description of a stored procedure or function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcMetaData {
    name: String,
    params: Vec<ProcParam>,
    return_type: Option<WireType>,
}

impl ProcMetaData {
    /// Builds a descriptor; `name` may be schema-qualified (`pkg.proc`).
    ///
    /// # Errors
    /// - `InvalidIdentifier` for a malformed procedure name.
    /// - `InvalidConfig` for empty or duplicate parameter names.
    pub fn new<I, S>(
        name: impl Into<String>,
        params: I,
        return_type: Option<WireType>,
    ) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (S, WireType)>,
        S: Into<String>,
    {
        let name = name.into();
        for segment in name.split('.') {
            ensure_identifier(segment).map_err(|_| ModelError::InvalidIdentifier(name.clone()))?;
        }

        let mut declared: Vec<ProcParam> = Vec::new();
        for (param, wire) in params {
            let param = param.into();
            if param.trim().is_empty() {
                return Err(ModelError::InvalidConfig(format!(
                    "procedure `{name}` declares a parameter without a name"
                )));
            }
            if declared.iter().any(|existing| existing.name == param) {
                return Err(ModelError::InvalidConfig(format!(
                    "procedure `{name}` declares parameter `{param}` twice"
                )));
            }
            declared.push(ProcParam { name: param, wire });
        }

        Ok(Self {
            name,
            params: declared,
            return_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ProcParam] {
        &self.params
    }

    pub fn return_type(&self) -> Option<WireType> {
        self.return_type
    }

    pub fn slots(&self) -> Vec<Slot> {
        assign_slots(self.return_type, &self.params)
    }

    /// Call text with one placeholder per slot.
    ///
    /// `CALL name(?,?)` for procedures, `? = CALL name(?,?)` when a return
    /// type is declared.
    pub fn call_sql(&self) -> String {
        let placeholders = vec!["?"; self.params.len()].join(",");
        match self.return_type {
            Some(_) => format!("? = CALL {}({placeholders})", self.name),
            None => format!("CALL {}({placeholders})", self.name),
        }
    }
}
