//! Table descriptor and SQL text generation.
//!
//! # Responsibility
//! - Render INSERT/UPDATE/DELETE/SELECT text for one table.
//! - Reject columns that are not part of the table definition.
//!
//! # Invariants
//! - Generation is pure: same descriptor and inputs give the same text.
//! - Rendered column order follows definition order (or caller order for
//!   insert/update column lists).
//! - With soft delete enabled, generated UPDATE/DELETE/SELECT never touch
//!   rows where `deactivated=1`.
//! - Placeholder order: INSERT key then values; UPDATE values then key;
//!   DELETE key; SELECT key then filter values then paging.

use crate::error::{ModelError, ModelResult};
use crate::meta::filter::{FilterSet, SortField};
use crate::meta::wire::{PrimaryKeyType, WireType};
use crate::meta::{ensure_identifier, DEACTIVATED_COLUMN, KEY_COLUMN};

/// One column of a table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub wire: WireType,
}

/// `LIMIT`/`OFFSET` for a paged select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Immutable description of a table-backed entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetaData {
    table_name: String,
    columns: Vec<ColumnDef>,
    pk_type: PrimaryKeyType,
    soft_delete: bool,
}

impl TableMetaData {
    /// Builds a descriptor from columns in definition order.
    ///
    /// # Errors
    /// - `InvalidIdentifier` when the table or a column name is not a plain
    ///   identifier.
    /// - `InvalidConfig` for duplicate columns or a column named like the
    ///   reserved `id`/`deactivated` columns.
    pub fn new<I, S>(
        table_name: impl Into<String>,
        columns: I,
        pk_type: PrimaryKeyType,
        soft_delete: bool,
    ) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (S, WireType)>,
        S: Into<String>,
    {
        let table_name = table_name.into();
        ensure_identifier(&table_name)?;

        let mut defs: Vec<ColumnDef> = Vec::new();
        for (name, wire) in columns {
            let name = name.into();
            ensure_identifier(&name)?;
            if name == KEY_COLUMN || name == DEACTIVATED_COLUMN {
                return Err(ModelError::InvalidConfig(format!(
                    "column `{name}` of table `{table_name}` is reserved"
                )));
            }
            if defs.iter().any(|def| def.name == name) {
                return Err(ModelError::InvalidConfig(format!(
                    "column `{name}` is defined twice for table `{table_name}`"
                )));
            }
            defs.push(ColumnDef { name, wire });
        }

        Ok(Self {
            table_name,
            columns: defs,
            pk_type,
            soft_delete,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Column definitions in definition order.
    pub fn column_def(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn pk_type(&self) -> PrimaryKeyType {
        self.pk_type
    }

    pub fn soft_delete(&self) -> bool {
        self.soft_delete
    }

    /// Wire type of `column`, or `None` when the table does not define it.
    pub fn wire_type(&self, column: &str) -> Option<WireType> {
        self.columns
            .iter()
            .find(|def| def.name == column)
            .map(|def| def.wire)
    }

    /// Wire type of `column`, or an invalid-field error naming this table.
    pub fn require_column(&self, column: &str) -> ModelResult<WireType> {
        self.wire_type(column)
            .ok_or_else(|| ModelError::invalid_field(&self.table_name, column))
    }

    pub fn gen_insert_sql<'a, I>(&self, columns: I, auto_generated_key: bool) -> ModelResult<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut insert_clause = format!("INSERT INTO {}", self.table_name);
        let mut values_clause = String::from(" VALUES");

        let mut prefix = if auto_generated_key {
            " ("
        } else {
            insert_clause.push_str(" (`id`");
            values_clause.push_str(" (?");
            ","
        };

        for column in columns {
            self.require_column(column)?;
            insert_clause.push_str(prefix);
            insert_clause.push('`');
            insert_clause.push_str(column);
            insert_clause.push('`');
            values_clause.push_str(prefix);
            values_clause.push('?');
            prefix = ",";
        }

        if prefix != "," {
            return Ok(insert_clause + " DEFAULT VALUES");
        }
        insert_clause.push(')');
        values_clause.push(')');
        Ok(insert_clause + &values_clause)
    }

    /// # Errors
    /// - `InvalidField` for an undefined column.
    /// - `EmptyUpdate` when `columns` is empty.
    pub fn gen_update_sql<'a, I>(&self, columns: I) -> ModelResult<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sql = format!("UPDATE {} SET", self.table_name);

        let mut prefix = " `";
        let mut assigned = 0;
        for column in columns {
            self.require_column(column)?;
            sql.push_str(prefix);
            sql.push_str(column);
            sql.push_str("`=?");
            prefix = ",`";
            assigned += 1;
        }
        if assigned == 0 {
            return Err(ModelError::EmptyUpdate {
                table: self.table_name.clone(),
            });
        }

        sql.push_str(" WHERE `id`=?");
        if self.soft_delete {
            sql.push_str(" AND `deactivated`=0");
        }
        Ok(sql)
    }

    pub fn gen_delete_sql(&self) -> String {
        if self.soft_delete {
            format!(
                "UPDATE {} SET `deactivated`=1 WHERE `deactivated`=0 AND `id`=?",
                self.table_name
            )
        } else {
            format!("DELETE FROM {} WHERE `id`=?", self.table_name)
        }
    }

    /// Renders a select over `id` plus every defined column.
    ///
    /// `ORDER BY` is rendered only for all-rows selects.
    pub fn gen_select_sql(
        &self,
        all_rows: bool,
        filter: Option<&FilterSet>,
        sort_fields: Option<&[SortField]>,
    ) -> ModelResult<String> {
        let mut sql = String::from("SELECT `id`");
        for def in &self.columns {
            sql.push_str(",`");
            sql.push_str(&def.name);
            sql.push('`');
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table_name);

        let mut prefix = " WHERE ";
        if self.soft_delete {
            sql.push_str(prefix);
            sql.push_str("`deactivated`=0");
            prefix = " AND ";
        }
        if !all_rows {
            sql.push_str(prefix);
            sql.push_str("`id`=?");
            prefix = " AND ";
        }
        for condition in filter.into_iter().flatten() {
            self.require_column(condition.column())?;
            sql.push_str(prefix);
            sql.push('`');
            sql.push_str(condition.column());
            sql.push('`');
            sql.push_str(condition.operator().as_str());
            sql.push('?');
            prefix = " AND ";
        }

        match sort_fields {
            Some(fields) if all_rows && !fields.is_empty() => {
                let mut prefix = " ORDER BY ";
                for field in fields {
                    self.require_column(field.column())?;
                    sql.push_str(prefix);
                    sql.push_str(&field.render());
                    prefix = ",";
                }
            }
            _ => {}
        }

        Ok(sql)
    }

    /// All-rows select followed by `LIMIT`/`OFFSET` placeholders for `page`.
    pub fn gen_paged_select_sql(
        &self,
        filter: Option<&FilterSet>,
        sort_fields: Option<&[SortField]>,
        page: Page,
    ) -> ModelResult<String> {
        let mut sql = self.gen_select_sql(true, filter, sort_fields)?;
        match page.limit {
            Some(_) => {
                sql.push_str(" LIMIT ?");
                if page.offset > 0 {
                    sql.push_str(" OFFSET ?");
                }
            }
            None if page.offset > 0 => sql.push_str(" LIMIT -1 OFFSET ?"),
            None => {}
        }
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, TableMetaData};
    use crate::error::ModelError;
    use crate::meta::filter::{Comparison, FilterCondition, FilterSet, SortField};
    use crate::meta::wire::{PrimaryKeyType, WireType};
    use rusqlite::types::Value;

    const COLUMNS: [(&str, WireType); 4] = [
        ("empcode", WireType::Integer),
        ("loginname", WireType::Varchar),
        ("password", WireType::Varchar),
        ("loginenabled", WireType::Varchar),
    ];

    fn meta(soft_delete: bool) -> TableMetaData {
        TableMetaData::new("test_table", COLUMNS, PrimaryKeyType::Varchar, soft_delete)
            .expect("test table should be valid")
    }

    fn column_names() -> Vec<&'static str> {
        COLUMNS.iter().map(|(name, _)| *name).collect()
    }

    fn sample_filter() -> FilterSet {
        [
            FilterCondition::new(
                "loginenabled",
                Comparison::Eq,
                Value::Text("y".to_string()),
                WireType::Varchar,
            ),
            FilterCondition::new("empcode", Comparison::Gt, Value::Integer(100), WireType::Integer),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn column_def_keeps_definition_order() {
        let binding = meta(true);
        let names: Vec<_> = binding
            .column_def()
            .iter()
            .map(|def| def.name.as_str())
            .collect();
        assert_eq!(names, column_names());
        assert_eq!(meta(true).wire_type("empcode"), Some(WireType::Integer));
    }

    #[test]
    fn insert_without_generated_key_leads_with_id() {
        let sql = meta(true).gen_insert_sql(column_names(), false).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO test_table (`id`,`empcode`,`loginname`,`password`,`loginenabled`) VALUES (?,?,?,?,?)"
        );
    }

    #[test]
    fn insert_with_generated_key_omits_id() {
        let sql = meta(true).gen_insert_sql(column_names(), true).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO test_table (`empcode`,`loginname`,`password`,`loginenabled`) VALUES (?,?,?,?)"
        );
        assert_eq!(sql.matches('?').count(), COLUMNS.len());
        assert!(!sql.contains("`id`"));
    }

    #[test]
    fn generated_key_insert_without_columns_uses_defaults() {
        let sql = meta(true).gen_insert_sql([], true).unwrap();
        assert_eq!(sql, "INSERT INTO test_table DEFAULT VALUES");
    }

    #[test]
    fn insert_counts_match_column_subset() {
        let sql = meta(false).gen_insert_sql(["loginname"], false).unwrap();
        assert_eq!(sql.matches('?').count(), 2);
        assert_eq!(sql.matches('`').count(), 4);
    }

    #[test]
    fn update_scopes_to_active_rows_with_soft_delete() {
        let sql = meta(true).gen_update_sql(column_names()).unwrap();
        assert_eq!(
            sql,
            "UPDATE test_table SET `empcode`=?,`loginname`=?,`password`=?,`loginenabled`=? WHERE `id`=? AND `deactivated`=0"
        );
    }

    #[test]
    fn update_without_soft_delete_ends_with_key() {
        let sql = meta(false).gen_update_sql(["loginname"]).unwrap();
        assert_eq!(sql, "UPDATE test_table SET `loginname`=? WHERE `id`=?");
    }

    #[test]
    fn update_without_columns_is_rejected() {
        let err = meta(true).gen_update_sql([]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyUpdate { ref table } if table == "test_table"));
    }

    #[test]
    fn unknown_column_fails_insert_and_update() {
        for result in [
            meta(true).gen_insert_sql(["loginname", "salary"], false),
            meta(true).gen_update_sql(["salary"]),
        ] {
            match result {
                Err(ModelError::InvalidField { table, column }) => {
                    assert_eq!(table, "test_table");
                    assert_eq!(column, "salary");
                }
                other => panic!("expected invalid field, got {other:?}"),
            }
        }
    }

    #[test]
    fn delete_with_soft_delete_is_a_stable_update() {
        let first = meta(true).gen_delete_sql();
        let second = meta(true).gen_delete_sql();
        assert_eq!(
            first,
            "UPDATE test_table SET `deactivated`=1 WHERE `deactivated`=0 AND `id`=?"
        );
        assert_eq!(first, second);
    }

    #[test]
    fn delete_without_soft_delete_removes_row() {
        assert_eq!(
            meta(false).gen_delete_sql(),
            "DELETE FROM test_table WHERE `id`=?"
        );
    }

    #[test]
    fn select_one_puts_deactivated_before_key() {
        let sql = meta(true).gen_select_sql(false, None, None).unwrap();
        assert_eq!(
            sql,
            "SELECT `id`,`empcode`,`loginname`,`password`,`loginenabled` FROM test_table WHERE `deactivated`=0 AND `id`=?"
        );
    }

    #[test]
    fn select_all_appends_filter_in_set_order() {
        let filter = sample_filter();
        let sql = meta(true).gen_select_sql(true, Some(&filter), None).unwrap();
        assert_eq!(
            sql,
            "SELECT `id`,`empcode`,`loginname`,`password`,`loginenabled` FROM test_table WHERE `deactivated`=0 AND `loginenabled`=? AND `empcode`>?"
        );
    }

    #[test]
    fn select_all_without_soft_delete_opens_where_with_first_filter() {
        let filter = sample_filter();
        let sql = meta(false).gen_select_sql(true, Some(&filter), None).unwrap();
        assert!(sql.ends_with(" FROM test_table WHERE `loginenabled`=? AND `empcode`>?"));
        assert_eq!(sql.matches('?').count(), filter.len());
    }

    #[test]
    fn select_ordered_renders_validated_fields() {
        let filter = sample_filter();
        let sort = vec![
            SortField::parse("test_table", "`loginname`").unwrap(),
            SortField::parse("test_table", "empcode DESC").unwrap(),
        ];
        let sql = meta(true)
            .gen_select_sql(true, Some(&filter), Some(sort.as_slice()))
            .unwrap();
        assert!(sql.ends_with(
            "WHERE `deactivated`=0 AND `loginenabled`=? AND `empcode`>? ORDER BY `loginname`,`empcode` DESC"
        ));
    }

    #[test]
    fn order_by_is_skipped_for_single_row_and_empty_fields() {
        let sort = vec![SortField::parse("test_table", "loginname").unwrap()];
        let single = meta(true).gen_select_sql(false, None, Some(sort.as_slice())).unwrap();
        assert!(!single.contains("ORDER BY"));

        let empty = meta(true).gen_select_sql(true, None, Some(&[][..])).unwrap();
        assert!(!empty.contains("ORDER BY"));
    }

    #[test]
    fn unknown_sort_or_filter_column_fails() {
        let sort = vec![SortField::parse("test_table", "salary").unwrap()];
        let err = meta(true).gen_select_sql(true, None, Some(sort.as_slice())).unwrap_err();
        assert!(matches!(err, ModelError::InvalidField { ref column, .. } if column == "salary"));

        let filter: FilterSet = [FilterCondition::new(
            "salary",
            Comparison::Eq,
            Value::Integer(1),
            WireType::Integer,
        )]
        .into_iter()
        .collect();
        let err = meta(true).gen_select_sql(true, Some(&filter), None).unwrap_err();
        assert!(matches!(err, ModelError::InvalidField { .. }));
    }

    #[test]
    fn paged_select_appends_limit_and_offset() {
        let limited = meta(false)
            .gen_paged_select_sql(None, None, Page { limit: Some(10), offset: 20 })
            .unwrap();
        assert!(limited.ends_with("FROM test_table LIMIT ? OFFSET ?"));

        let offset_only = meta(false)
            .gen_paged_select_sql(None, None, Page { limit: None, offset: 5 })
            .unwrap();
        assert!(offset_only.ends_with("FROM test_table LIMIT -1 OFFSET ?"));

        let unpaged = meta(false)
            .gen_paged_select_sql(None, None, Page::default())
            .unwrap();
        assert_eq!(unpaged, meta(false).gen_select_sql(true, None, None).unwrap());
    }

    #[test]
    fn construction_rejects_bad_identifiers_and_reserved_columns() {
        let err = TableMetaData::new(
            "users; DROP",
            [("name", WireType::Varchar)],
            PrimaryKeyType::Varchar,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidIdentifier(_)));

        let err = TableMetaData::new(
            "users",
            [("deactivated", WireType::Integer)],
            PrimaryKeyType::Varchar,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));

        let err = TableMetaData::new(
            "users",
            [("name", WireType::Varchar), ("name", WireType::Char)],
            PrimaryKeyType::Varchar,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
