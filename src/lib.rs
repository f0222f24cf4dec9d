pub mod checks;
pub mod cli;
pub mod config;
pub mod framework;
pub mod logging;
pub mod report;

pub const RHUI_CHECK_VERSION: &str = env!("CARGO_PKG_VERSION");
