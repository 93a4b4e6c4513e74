//! Rolling file logs for roster processes.
//!
//! # Responsibility
//! - Start one process-wide `flexi_logger` backend from `[logging]` settings.
//! - Keep log lines metadata-only: ids and counters, never names or emails.
//!
//! # Invariants
//! - A second start with identical settings is a no-op.
//! - A second start with a different level or directory is an error.
//! - Starting the logger never panics.

use crate::config::LoggingConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "roster";
const BYTES_PER_MB: u64 = 1024 * 1024;
const PANIC_PAYLOAD_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Validated logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    dir: PathBuf,
    max_file_bytes: u64,
    keep_files: usize,
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// Uses the default rotation limits of [`LoggingConfig`].
///
/// # Errors
/// - Unknown level, empty or relative directory.
/// - Logger already running with another level or directory.
/// - Directory creation or backend start failure.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), String> {
    let defaults = LoggingConfig::default();
    let settings = LogSettings {
        level: parse_level(level)?,
        dir: check_log_dir(log_dir.as_ref())?,
        max_file_bytes: defaults.max_file_mb.saturating_mul(BYTES_PER_MB),
        keep_files: defaults.keep_files,
    };
    start(settings)
}

/// Starts file logging from the `[logging]` config section.
///
/// Returns `Ok(false)` and leaves logging off when `dir` is unset.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<bool, String> {
    let Some(dir) = config.dir.as_deref() else {
        return Ok(false);
    };
    let settings = LogSettings {
        level: parse_level(&config.level)?,
        dir: check_log_dir(dir)?,
        max_file_bytes: config.max_file_mb.max(1).saturating_mul(BYTES_PER_MB),
        keep_files: config.keep_files.max(1),
    };
    start(settings).map(|()| true)
}

/// `(level, directory)` of the running logger, `None` before the first start.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.settings.level, active.settings.dir.clone()))
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(settings: LogSettings) -> Result<(), String> {
    let active = ACTIVE.get_or_try_init(|| spawn_logger(settings.clone()))?;
    same_target(&active.settings, &settings)
}

fn same_target(running: &LogSettings, requested: &LogSettings) -> Result<(), String> {
    if running.dir != requested.dir {
        return Err(format!(
            "logger already writes to `{}`; refusing to switch to `{}`",
            running.dir.display(),
            requested.dir.display()
        ));
    }
    if running.level != requested.level {
        return Err(format!(
            "logger already runs at `{}`; refusing to switch to `{}`",
            running.level, requested.level
        ));
    }
    Ok(())
}

fn spawn_logger(settings: LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        format!(
            "cannot create log directory `{}`: {err}",
            settings.dir.display()
        )
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", settings.level))?
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(settings.max_file_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(settings.keep_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))?;

    hook_panics();
    info!(
        "event=logging_start module=logging status=ok version={} os={} level={} dir={} keep_files={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        settings.level,
        settings.dir.display(),
        settings.keep_files
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        other => {
            return Err(format!(
                "unknown log level `{other}`, use trace|debug|info|warn|error"
            ))
        }
    };
    Ok(level)
}

fn check_log_dir(dir: &Path) -> Result<PathBuf, String> {
    if dir.as_os_str().is_empty() {
        return Err("log directory is empty".to_string());
    }
    if dir.is_relative() {
        return Err(format!(
            "log directory must be absolute, got `{}`",
            dir.display()
        ));
    }
    Ok(dir.to_path_buf())
}

fn hook_panics() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            one_line(&payload, PANIC_PAYLOAD_LIMIT)
        );
        chained(panic_info);
    }));
}

/// Flattens `text` to one line of at most `limit` chars, marking truncation.
fn one_line(text: &str, limit: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        check_log_dir, init_logging, init_logging_from_config, logging_status, one_line,
        parse_level,
    };
    use crate::config::LoggingConfig;
    use std::path::Path;

    #[test]
    fn levels_are_case_insensitive_and_closed() {
        assert_eq!(parse_level(" DEBUG ").unwrap(), "debug");
        assert_eq!(parse_level("warning").unwrap(), "warn");
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn log_dir_must_be_absolute() {
        assert!(check_log_dir(Path::new("")).is_err());
        assert!(check_log_dir(Path::new("logs/dev"))
            .unwrap_err()
            .contains("absolute"));
    }

    #[test]
    fn one_line_flattens_and_truncates() {
        assert_eq!(one_line("a\nb", 10), "a b");
        assert_eq!(one_line("abcdefghij", 4), "abcd...");
        assert_eq!(one_line("abcd", 4), "abcd");
    }

    #[test]
    fn config_without_dir_keeps_logging_off() {
        assert_eq!(
            init_logging_from_config(&LoggingConfig::default()),
            Ok(false)
        );
    }

    // The only test in this binary that starts the global logger.
    #[test]
    fn restart_with_same_settings_is_noop_and_conflicts_fail() {
        let log_dir = tempfile::tempdir().unwrap();
        let other_dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            dir: Some(log_dir.path().to_path_buf()),
            ..LoggingConfig::default()
        };

        assert_eq!(init_logging_from_config(&config), Ok(true));
        init_logging("INFO", log_dir.path()).unwrap();
        assert!(init_logging("debug", log_dir.path())
            .unwrap_err()
            .contains("refusing to switch"));
        assert!(init_logging("info", other_dir.path())
            .unwrap_err()
            .contains("refusing to switch"));

        let (level, dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(dir, log_dir.path());
    }
}
