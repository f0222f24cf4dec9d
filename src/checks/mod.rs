//! Registration checks run against the host once the framework is known.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};
use serde::Serialize;
use strum_macros::{Display, EnumIter};

use osutils::path;

use crate::framework::Framework;

mod region;
mod registration;
mod repos;
mod system;
mod update_server;

/// Everything a check needs to know about the host it inspects.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Root of the host filesystem; every host path is resolved under it.
    pub root: PathBuf,
    pub framework: Framework,
    /// Whether checks may repair what they find.
    pub fix: bool,
    /// Timeout applied to every network operation.
    pub timeout: Duration,
}

impl CheckContext {
    /// Resolves an absolute host path under the configured root.
    pub fn host_path(&self, host_path: impl AsRef<Path>) -> PathBuf {
        path::join_relative(&self.root, host_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    OsRelease,
    Packages,
    MetadataTool,
    RegionConfig,
    RegionCerts,
    RegionConnectivity,
    UpdateServerHosts,
    UpdateServerHealth,
    Credentials,
    BaseProduct,
    Repositories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Fixed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub check: CheckKind,
    pub status: CheckStatus,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CheckResult {
    fn new(check: CheckKind, status: CheckStatus, summary: impl Into<String>) -> Self {
        Self {
            check,
            status,
            summary: summary.into(),
            details: Vec::new(),
        }
    }

    pub fn pass(check: CheckKind, summary: impl Into<String>) -> Self {
        Self::new(check, CheckStatus::Pass, summary)
    }

    pub fn fail(check: CheckKind, summary: impl Into<String>) -> Self {
        Self::new(check, CheckStatus::Fail, summary)
    }

    pub fn fixed(check: CheckKind, summary: impl Into<String>) -> Self {
        Self::new(check, CheckStatus::Fixed, summary)
    }

    pub fn skipped(check: CheckKind, reason: impl std::fmt::Display) -> Self {
        Self::new(check, CheckStatus::Skipped, format!("Skipped: {reason}"))
    }

    /// Turns an error into a failed result, keeping the whole error chain.
    pub fn from_error(check: CheckKind, summary: impl Into<String>, error: anyhow::Error) -> Self {
        Self::fail(check, summary).with_details(vec![format!("{error:#}")])
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == CheckStatus::Fail
    }
}

/// Runs every check in order. Checks that depend on a failed check are skipped.
pub fn run_checks(ctx: &CheckContext) -> Vec<CheckResult> {
    info!("Running registration checks for framework '{}'", ctx.framework);

    let mut results = vec![
        system::check_os_release(ctx),
        system::check_packages(ctx),
        system::check_metadata_tool(ctx),
    ];

    match region::load_config(ctx) {
        Ok((result, config)) => {
            results.push(result);
            results.push(region::check_certs(ctx, &config));
            results.push(region::check_connectivity(ctx, &config));
        }
        Err(result) => {
            results.push(result);
            results.push(CheckResult::skipped(
                CheckKind::RegionCerts,
                "region server configuration unavailable",
            ));
            results.push(CheckResult::skipped(
                CheckKind::RegionConnectivity,
                "region server configuration unavailable",
            ));
        }
    }

    match update_server::check_hosts(ctx) {
        Ok((result, address)) => {
            results.push(result);
            results.push(update_server::check_health(ctx, address));
        }
        Err(result) => {
            results.push(result);
            results.push(CheckResult::skipped(
                CheckKind::UpdateServerHealth,
                "update server address unknown",
            ));
        }
    }

    results.push(registration::check_credentials(ctx));
    results.push(registration::check_base_product(ctx));
    results.push(repos::check_repositories(ctx));

    for result in &results {
        match result.status {
            CheckStatus::Fail => warn!("Check '{}' failed: {}", result.check, result.summary),
            _ => info!("Check '{}': {}", result.check, result.summary),
        }
        for detail in &result.details {
            debug!("  {detail}");
        }
    }

    results
}

#[cfg(test)]
pub(crate) mod testutils {
    use std::time::Duration;

    use tempfile::TempDir;

    use osutils::files;

    use super::CheckContext;
    use crate::framework::Framework;

    /// Creates a context rooted in a fresh temporary directory.
    pub fn context(framework: Framework) -> (TempDir, CheckContext) {
        let root = tempfile::tempdir().unwrap();
        let ctx = CheckContext {
            root: root.path().to_path_buf(),
            framework,
            fix: false,
            timeout: Duration::from_millis(500),
        };
        (root, ctx)
    }

    /// Writes a file below the root of the context.
    pub fn write_host_file(ctx: &CheckContext, host_path: &str, contents: &str) {
        files::write_file(ctx.host_path(host_path), 0o644, contents.as_bytes()).unwrap();
    }
}
