//! Operator entry point.
//!
//! # Responsibility
//! - Verify `roster_core` linkage (`ping`).
//! - Provision counters out-of-band before the first record of a group.
//! - Report collection totals.
//!
//! Usage: `roster_cli [--config PATH] <ping|init-config|provision GROUP TOTAL|totals>`

use log::error;
use roster_core::db::open_db;
use roster_core::{
    init_logging_from_config, CounterRepository, RosterConfig, SqliteDocumentStore,
    StudentService, TeacherService,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={}", message);
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(mut args: Vec<String>) -> Result<(), String> {
    let config_path = take_config_flag(&mut args)?
        .unwrap_or_else(|| PathBuf::from(roster_core::config::CONFIG_FILE_NAME));
    let command = if args.is_empty() {
        "ping".to_string()
    } else {
        args.remove(0)
    };

    match command.as_str() {
        "ping" => {
            println!("roster_core ping={}", roster_core::ping());
            println!("roster_core version={}", roster_core::core_version());
            Ok(())
        }
        "init-config" => {
            RosterConfig::write_default_if_missing(&config_path).map_err(|err| err.to_string())?;
            println!("config={}", config_path.display());
            Ok(())
        }
        "provision" => {
            let [group, total] = args.as_slice() else {
                return Err("usage: provision GROUP TOTAL".to_string());
            };
            let total: u64 = total
                .parse()
                .map_err(|_| format!("TOTAL must be a non-negative integer, got `{total}`"))?;
            let config = load_config(&config_path)?;
            let conn = open_db(&config.database).map_err(|err| err.to_string())?;
            let store = SqliteDocumentStore::try_new(&conn).map_err(|err| err.to_string())?;
            let counter = CounterRepository::new(&store)
                .provision(group, total)
                .map_err(|err| err.to_string())?;
            println!("classes/{} total={}", counter.group_key, counter.total);
            Ok(())
        }
        "totals" => {
            let config = load_config(&config_path)?;
            let conn = open_db(&config.database).map_err(|err| err.to_string())?;
            let store = SqliteDocumentStore::try_new(&conn).map_err(|err| err.to_string())?;
            let students = StudentService::new(&store)
                .total_students()
                .map_err(|err| err.to_string())?;
            let teachers = TeacherService::new(&store)
                .total_teachers()
                .map_err(|err| err.to_string())?;
            println!("students={students} teachers={teachers}");
            Ok(())
        }
        other => Err(format!("unknown command `{other}`")),
    }
}

fn take_config_flag(args: &mut Vec<String>) -> Result<Option<PathBuf>, String> {
    let Some(index) = args.iter().position(|arg| arg == "--config") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err("--config needs a path".to_string());
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Ok(Some(PathBuf::from(path)))
}

fn load_config(path: &Path) -> Result<RosterConfig, String> {
    let config = if path.exists() {
        RosterConfig::from_file(path).map_err(|err| err.to_string())?
    } else {
        RosterConfig::default()
    };
    init_logging_from_config(&config.logging)?;
    Ok(config)
}
