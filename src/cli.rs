use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::RHUI_CHECK_VERSION;

/// Default location of the JSON log file.
pub const DEFAULT_LOG_FILE: &str = "/var/log/rhui-check.log";

/// Checks and repairs the registration of this instance with the SUSE update infrastructure
#[derive(Parser, Debug)]
#[clap(version = RHUI_CHECK_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    /// Repair the problems that can be fixed locally, such as stale repository files
    #[arg(long)]
    pub fix: bool,

    /// Format of the final report
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Timeout in seconds for every network check
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// File receiving a JSON log of the run
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Do not write a log file
    #[arg(long, conflicts_with = "log_file")]
    pub no_log_file: bool,

    /// Root of the host filesystem to inspect
    #[arg(long, default_value = "/", hide = true)]
    pub root: PathBuf,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn log_file(&self) -> Option<&PathBuf> {
        (!self.no_log_file).then_some(&self.log_file)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}
