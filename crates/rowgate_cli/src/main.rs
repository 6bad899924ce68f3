//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load an entity configuration and print the statements the core
//!   generates for it.
//! - Keep output deterministic so it can be diffed between runs.

use rowgate_core::{EntityConfig, ModelResult, Operation, ProcMetaData, TableMetaData};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: rowgate_cli <entity.json> [--log-dir <absolute dir>]";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let (config_path, log_dir) = match parse_args(&args) {
        Some(parsed) => parsed,
        None => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Some(log_dir) = log_dir {
        if let Err(err) = rowgate_core::init_logging(rowgate_core::default_log_level(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Option<(&str, Option<&str>)> {
    match args {
        [path] => Some((path.as_str(), None)),
        [path, flag, dir] if flag == "--log-dir" => Some((path.as_str(), Some(dir.as_str()))),
        _ => None,
    }
}

fn run(config_path: &str) -> ModelResult<()> {
    let config = EntityConfig::from_path(config_path)?;
    println!("rowgate_core version={}", rowgate_core::core_version());

    if let Some(meta) = config.table_meta()? {
        print_table(&meta)?;
    }
    for (operation, meta) in config.procedures()? {
        print_procedure(operation, &meta);
    }
    Ok(())
}

fn print_table(meta: &TableMetaData) -> ModelResult<()> {
    let columns: Vec<&str> = meta.column_def().iter().map(|def| def.name.as_str()).collect();

    println!("table={} soft_delete={}", meta.table_name(), meta.soft_delete());
    println!("insert: {}", meta.gen_insert_sql(columns.iter().copied(), false)?);
    println!("update: {}", meta.gen_update_sql(columns.iter().copied())?);
    println!("delete: {}", meta.gen_delete_sql());
    println!("read:   {}", meta.gen_select_sql(false, None, None)?);
    println!("list:   {}", meta.gen_select_sql(true, None, None)?);
    Ok(())
}

fn print_procedure(operation: Operation, meta: &ProcMetaData) {
    println!("{}: {}", operation.as_str(), meta.call_sql());
}
