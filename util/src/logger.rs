//! Logger setup
//!
//! Logging goes through the `log` facade everywhere. Executables call
//! [`logger_init`] once, which installs a `fern` dispatcher writing to the
//! session log file and, optionally, stdout.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Logger configuration, normally loaded from `logger.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerParams {
    /// Lowest level that will be written. Must be `Info` or more verbose.
    pub min_level: LevelFilter,

    /// Per-target overrides, e.g. `"drive_lib::traj_ctrl" = "Trace"`.
    #[serde(default)]
    pub target_levels: BTreeMap<String, LevelFilter>,

    /// Echo log lines to stdout as well as the session log file.
    #[serde(default = "default_stdout")]
    pub stdout: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LoggerParams {
    /// Params logging everything at or above `min_level` to stdout and file.
    pub fn with_level(min_level: LevelFilter) -> Self {
        Self {
            min_level,
            target_levels: BTreeMap::new(),
            stdout: true,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `params.min_level` must be greater than `log::Level::Info`.
/// - This function must only be called once, the second call returns
///   `FernInitError`.
pub fn logger_init(
    params: &LoggerParams,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if params.min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(params.min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(params.min_level);

    for (target, level) in &params.target_levels {
        dispatch = dispatch.level_for(target.clone(), *level);
    }

    if params.stdout {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Ok(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", params.min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_stdout() -> bool {
    true
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_from_toml() {
        let params: LoggerParams = crate::params::from_str(
            "min_level = \"Debug\"\n\n[target_levels]\n\"drive_lib::traj_ctrl\" = \"Trace\"\n",
        )
        .unwrap();

        assert_eq!(params.min_level, LevelFilter::Debug);
        assert!(params.stdout);
        assert_eq!(
            params.target_levels.get("drive_lib::traj_ctrl"),
            Some(&LevelFilter::Trace)
        );
    }
}
