//! Filter predicates and sort directives for list queries.
//!
//! # Invariants
//! - `FilterCondition` equality covers column, operator, value and wire type.
//! - `FilterSet` iterates in insertion order; rendering and binding both use
//!   that one order.

use crate::error::{ModelError, ModelResult};
use crate::meta::wire::WireType;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;

static SORT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(`?)([A-Za-z_][A-Za-z0-9_]*)(`?)(?:\s+(asc|desc))?\s*$")
        .expect("sort token pattern is valid")
});

/// Comparison operator of one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => " LIKE ",
        }
    }

    /// Parses the textual operator form (`=`, `!=`, `>=`, `like`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Some(Self::Eq),
            "<>" | "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtEq),
            "like" => Some(Self::Like),
            _ => None,
        }
    }
}

/// One `<column><op>?` predicate with its bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    column: String,
    operator: Comparison,
    value: Value,
    wire: WireType,
}

impl FilterCondition {
    pub fn new(
        column: impl Into<String>,
        operator: Comparison,
        value: Value,
        wire: WireType,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            wire,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Comparison {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn wire(&self) -> WireType {
        self.wire
    }
}

/// Insertion-ordered set of filter conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    conditions: Vec<FilterCondition>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `condition` unless an identical one is already present.
    ///
    /// Returns whether the set changed.
    pub fn insert(&mut self, condition: FilterCondition) -> bool {
        if self.conditions.contains(&condition) {
            return false;
        }
        self.conditions.push(condition);
        true
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterCondition> {
        self.conditions.iter()
    }
}

impl FromIterator<FilterCondition> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterCondition>>(iter: I) -> Self {
        let mut set = Self::new();
        for condition in iter {
            set.insert(condition);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a FilterCondition;
    type IntoIter = std::slice::Iter<'a, FilterCondition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One validated `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    column: String,
    direction: SortDirection,
}

impl SortField {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Parses `col`, `` `col` `` or either form followed by `ASC`/`DESC`.
    ///
    /// Column existence is checked later against the table definition;
    /// `table` only labels the error for malformed tokens.
    pub fn parse(table: &str, token: &str) -> ModelResult<Self> {
        let captures = SORT_TOKEN
            .captures(token)
            .filter(|caps| caps[1] == caps[3])
            .ok_or_else(|| ModelError::invalid_field(table, token.trim()))?;

        let direction = match captures.get(4).map(|m| m.as_str().to_ascii_lowercase()) {
            Some(dir) if dir == "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        };

        Ok(Self::new(&captures[2], direction))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub(crate) fn render(&self) -> String {
        match self.direction {
            SortDirection::Asc => format!("`{}`", self.column),
            SortDirection::Desc => format!("`{}` DESC", self.column),
        }
    }
}
