use std::path::Path;

use anyhow::{Context, Error};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

mod file_log;
mod multilog;

use file_log::FileLog;
use multilog::MultiLogger;

/// A single line of the JSON log file.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
    pub target: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl From<log::Level> for Level {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<&log::Record<'_>> for LogEntry {
    fn from(value: &log::Record) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: value.level().into(),
            message: value.args().to_string(),
            target: value.target().to_string(),
            file: value.file().unwrap_or_default().to_string(),
            line: value.line().unwrap_or_default(),
        }
    }
}

/// Installs the global logger: human readable output on stderr at `verbosity`, plus a debug
/// level JSON log in `log_file` when one is given.
pub fn setup(verbosity: LevelFilter, log_file: Option<&Path>) -> Result<(), Error> {
    let mut multilogger = MultiLogger::new()
        .with_logger(Box::new(
            env_logger::builder()
                .format_timestamp(None)
                .filter_level(verbosity)
                .build(),
        ))
        // HTTP client internals are only interesting when tracing
        .with_target_cap("reqwest", LevelFilter::Debug)
        .with_target_cap("hyper", LevelFilter::Info);

    if let Some(log_file) = log_file {
        multilogger = multilogger.with_logger(FileLog::new(log_file).into_logger());
    }

    multilogger.init().context("Logger already registered")
}
