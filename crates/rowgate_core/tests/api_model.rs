mod common;

use common::{employees_db, Employee, RecordingStore};
use rowgate_core::db::DbError;
use rowgate_core::store::BoundParam;
use rowgate_core::{
    ApiModel, EntityConfig, JsonRowProcessor, ListOptions, Model, ModelError, Operation,
    OperationStrategy, PrimaryKeyType, ProcMetaData, SqliteStore, TableMetaData, WireType,
};
use rusqlite::types::Value;

fn employees_meta() -> TableMetaData {
    TableMetaData::new(
        "employees",
        [("empcode", WireType::Integer), ("loginname", WireType::Varchar)],
        PrimaryKeyType::Varchar,
        true,
    )
    .unwrap()
}

fn key_only(name: &str, returns: Option<WireType>) -> ProcMetaData {
    ProcMetaData::new(name, [("key", WireType::Varchar)], returns).unwrap()
}

fn employee_params(name: &str, returns: Option<WireType>) -> ProcMetaData {
    ProcMetaData::new(
        name,
        [
            ("key", WireType::Varchar),
            ("empcode", WireType::Integer),
            ("loginname", WireType::Varchar),
        ],
        returns,
    )
    .unwrap()
}

#[test]
fn unconfigured_operations_fail() {
    let store = RecordingStore::default();
    let model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());

    assert!(matches!(
        model.read("e-1"),
        Err(ModelError::Unconfigured(Operation::Read))
    ));
    assert!(matches!(
        model.create("e-1", &Employee::new(1, "ann")),
        Err(ModelError::Unconfigured(Operation::Insert))
    ));
    assert!(matches!(
        model.list(&ListOptions::default()),
        Err(ModelError::Unconfigured(Operation::List))
    ));
    assert!(store.recorded().is_empty());
}

#[test]
fn registered_procedure_wins_over_table() {
    let store = RecordingStore {
        affected: 1,
        ..RecordingStore::default()
    };
    let mut model = ApiModel::with_table(
        &store,
        JsonRowProcessor::<Employee>::new(),
        employees_meta(),
    );
    assert!(matches!(model.strategy(Operation::Delete), OperationStrategy::Table));

    model.register_procedure(Operation::Delete, key_only("emp_delete", None));
    assert!(matches!(
        model.strategy(Operation::Delete),
        OperationStrategy::Procedure(_)
    ));

    assert_eq!(model.delete("e-1").unwrap(), 1);
    model.update("e-1", &Employee::new(2, "bob")).unwrap();

    let recorded = store.recorded();
    assert_eq!(recorded[0].kind, "call");
    assert_eq!(recorded[0].sql, "CALL emp_delete(?)");
    assert_eq!(
        recorded[0].params,
        vec![BoundParam::value(1, Value::Text("e-1".to_string()), WireType::Varchar)]
    );
    assert_eq!(recorded[1].kind, "update");
    assert!(recorded[1].sql.starts_with("UPDATE employees SET"));
}

#[test]
fn procedure_update_injects_key_and_binds_body_by_name() {
    let store = RecordingStore {
        affected: 1,
        ..RecordingStore::default()
    };
    let mut model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());
    model.register_procedure(Operation::Update, employee_params("emp_update", None));

    assert_eq!(model.update("e-9", &Employee::new(5, "eve")).unwrap(), 1);

    let recorded = store.recorded();
    assert_eq!(
        recorded[0].params,
        vec![
            BoundParam::value(1, Value::Text("e-9".to_string()), WireType::Varchar),
            BoundParam::value(2, Value::Integer(5), WireType::Integer),
            BoundParam::value(3, Value::Text("eve".to_string()), WireType::Varchar),
        ]
    );
}

#[test]
fn function_result_is_the_affected_count() {
    let store = RecordingStore {
        affected: 99,
        outputs: vec![(1, Value::Integer(2))],
        ..RecordingStore::default()
    };
    let mut model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());
    model.register_procedure(
        Operation::Delete,
        key_only("emp_delete", Some(WireType::Integer)),
    );

    assert_eq!(model.delete("e-1").unwrap(), 2);
    let recorded = store.recorded();
    assert_eq!(recorded[0].sql, "? = CALL emp_delete(?)");
    assert_eq!(recorded[0].params[0], BoundParam::out(1, WireType::Integer));
}

#[test]
fn non_count_function_result_is_a_type_error() {
    let store = RecordingStore {
        outputs: vec![(1, Value::Text("done".to_string()))],
        ..RecordingStore::default()
    };
    let mut model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());
    model.register_procedure(
        Operation::Delete,
        key_only("emp_delete", Some(WireType::Varchar)),
    );

    let err = model.delete("e-1").unwrap_err();
    assert!(matches!(err, ModelError::Db(DbError::TypeMismatch { .. })));
}

#[test]
fn procedure_read_and_list_go_through_the_processor() {
    let store = RecordingStore::with_rows(
        &["id", "empcode", "loginname"],
        vec![vec![
            Value::Text("e-1".to_string()),
            Value::Integer(7),
            Value::Text("ann".to_string()),
        ]],
    );
    let mut model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());
    model.register_procedure(Operation::Read, key_only("emp_read", None));
    model.register_procedure(
        Operation::List,
        ProcMetaData::new("emp_list", [("loginname", WireType::Varchar)], None).unwrap(),
    );

    let loaded = model.read("e-1").unwrap();
    assert_eq!(loaded.loginname, "ann");

    let options = ListOptions::new().filter_eq("loginname", Value::Text("ann".to_string()));
    let listed = model.list(&options).unwrap();
    assert_eq!(listed.len(), 1);

    let recorded = store.recorded();
    assert_eq!(recorded[1].kind, "call_query");
    assert_eq!(
        recorded[1].params,
        vec![BoundParam::value(1, Value::Text("ann".to_string()), WireType::Varchar)]
    );
}

#[test]
fn procedure_read_with_no_rows_is_not_found() {
    let store = RecordingStore::default();
    let mut model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());
    model.register_procedure(Operation::Read, key_only("emp_read", None));
    let no_params: [(&str, WireType); 0] = [];
    model.register_procedure(
        Operation::List,
        ProcMetaData::new("emp_list", no_params, None).unwrap(),
    );

    assert!(matches!(model.read("nobody"), Err(ModelError::NotFound { .. })));
    assert!(model.list(&ListOptions::default()).unwrap().is_empty());
    assert_eq!(store.recorded()[1].sql, "CALL emp_list()");
}

#[test]
fn sqlite_routines_serve_procedure_strategies() {
    let conn = employees_db();
    let store = SqliteStore::new(&conn)
        .with_routine(
            "emp_insert",
            "INSERT INTO employees (id, empcode, loginname) VALUES (?1, ?2, ?3)",
        )
        .with_routine(
            "emp_read",
            "SELECT id, empcode, loginname FROM employees WHERE id = ?1 AND deactivated = 0",
        )
        .with_routine(
            "emp_count",
            "SELECT COUNT(*) FROM employees WHERE id = ?1 AND deactivated = 0",
        );
    let mut model =
        ApiModel::with_table(store, JsonRowProcessor::<Employee>::new(), employees_meta());
    model.register_procedure(Operation::Insert, employee_params("emp_insert", None));
    model.register_procedure(Operation::Read, key_only("emp_read", None));

    assert_eq!(model.create("e-1", &Employee::new(7, "ann")).unwrap(), 1);
    assert_eq!(model.read("e-1").unwrap().empcode, 7);

    // Delete stays on the table strategy.
    assert_eq!(model.delete("e-1").unwrap(), 1);
    assert!(matches!(model.read("e-1"), Err(ModelError::NotFound { .. })));

    model.register_procedure(
        Operation::Delete,
        key_only("emp_count", Some(WireType::BigInt)),
    );
    assert_eq!(model.delete("e-1").unwrap(), 0);
}

#[test]
fn unknown_routine_is_a_store_error() {
    let conn = employees_db();
    let mut model = ApiModel::new(SqliteStore::new(&conn), JsonRowProcessor::<Employee>::new());
    model.register_procedure(Operation::Delete, key_only("emp_missing", None));

    let err = model.delete("e-1").unwrap_err();
    assert!(matches!(
        err,
        ModelError::Db(DbError::UnknownRoutine(ref name)) if name == "emp_missing"
    ));
}

#[test]
fn create_generated_returns_the_minted_key() {
    let conn = employees_db();
    let model = ApiModel::with_table(
        SqliteStore::new(&conn),
        JsonRowProcessor::<Employee>::new(),
        employees_meta(),
    );

    let key = model.create_generated(&Employee::new(4, "dee")).unwrap();
    assert_eq!(key.len(), 36);
    assert_eq!(model.read(&key).unwrap().id.as_deref(), Some(key.as_str()));
}

#[test]
fn entity_config_wires_table_and_procedures() {
    let config = EntityConfig::from_json_str(
        r#"{
            "table": {
                "name": "employees",
                "columns": [
                    {"name": "empcode", "type": "integer"},
                    {"name": "loginname", "type": "varchar"}
                ],
                "soft_delete": true
            },
            "procedures": {
                "read": {"name": "emp_read", "params": [{"name": "key", "type": "varchar"}]}
            }
        }"#,
    )
    .unwrap();

    let conn = employees_db();
    let store = SqliteStore::new(&conn).with_routine(
        "emp_read",
        "SELECT id, empcode, loginname FROM employees WHERE id = ?1",
    );
    let model = config
        .build_api_model(store, JsonRowProcessor::<Employee>::new())
        .unwrap();

    assert!(matches!(
        model.strategy(Operation::Read),
        OperationStrategy::Procedure(_)
    ));
    assert!(matches!(model.strategy(Operation::List), OperationStrategy::Table));

    model.create("e-1", &Employee::new(1, "ann")).unwrap();
    model.delete("e-1").unwrap();
    // The routine ignores soft delete, the table list does not.
    assert_eq!(model.read("e-1").unwrap().loginname, "ann");
    assert!(model.list(&ListOptions::default()).unwrap().is_empty());
}

#[test]
fn procedure_list_rejects_table_only_directives() {
    let store = RecordingStore::default();
    let mut model = ApiModel::new(&store, JsonRowProcessor::<Employee>::new());
    model.register_procedure(
        Operation::List,
        ProcMetaData::new("emp_list", [("loginname", WireType::Varchar)], None).unwrap(),
    );

    for options in [
        ListOptions::new().order_by("loginname"),
        ListOptions::new().limit(10),
        ListOptions::new().offset(5),
        ListOptions::new().with_condition(
            "empcode",
            rowgate_core::Comparison::Gt,
            Value::Integer(1),
        ),
    ] {
        let err = model.list(&options).unwrap_err();
        assert!(matches!(err, ModelError::MalformedOptions(_)), "{options:?}");
        let mut sink = Vec::new();
        assert!(matches!(
            model.list_to(&mut sink, &options),
            Err(ModelError::MalformedOptions(_))
        ));
    }
    assert!(store.recorded().is_empty());

    let filtered = ListOptions::new().filter_eq("loginname", Value::Text("ann".to_string()));
    assert!(model.list(&filtered).unwrap().is_empty());
    assert_eq!(store.recorded().len(), 1);
}

#[test]
fn procedure_query_failures_propagate() {
    let conn = employees_db();
    let mut model = ApiModel::new(SqliteStore::new(&conn), JsonRowProcessor::<Employee>::new());
    model.register_procedure(Operation::Read, key_only("emp_missing_read", None));

    let err = model.read("e-1").unwrap_err();
    assert!(matches!(
        err,
        ModelError::Db(DbError::UnknownRoutine(ref name)) if name == "emp_missing_read"
    ));
}
