use log::debug;

use osutils::{dependencies::Dependency, osrelease::OsRelease};

use super::{CheckContext, CheckKind, CheckResult};

/// Package providing the region server client.
const REGION_SERVER_CLIENT_PACKAGE: &str = "cloud-regionsrv-client";

pub(super) fn check_os_release(ctx: &CheckContext) -> CheckResult {
    let os_release = match OsRelease::read_root(&ctx.root) {
        Ok(os_release) => os_release,
        Err(e) => {
            return CheckResult::from_error(
                CheckKind::OsRelease,
                "Could not determine the distribution",
                e,
            )
        }
    };

    if os_release.get_distro().is_suse_enterprise() {
        CheckResult::pass(
            CheckKind::OsRelease,
            format!("Running {}", os_release.describe()),
        )
    } else {
        CheckResult::fail(
            CheckKind::OsRelease,
            format!(
                "{} is not served by the update infrastructure",
                os_release.describe()
            ),
        )
    }
}

pub(super) fn check_packages(ctx: &CheckContext) -> CheckResult {
    let packages = [
        REGION_SERVER_CLIENT_PACKAGE.to_string(),
        ctx.framework.plugin_package(),
    ];

    let mut cmd = Dependency::Rpm.cmd();
    cmd.arg("-q").args(&packages);
    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            return CheckResult::from_error(
                CheckKind::Packages,
                "Could not query installed packages",
                anyhow::Error::from(*e),
            )
        }
    };

    let missing = missing_packages(&output.output());
    if !missing.is_empty() {
        return CheckResult::fail(
            CheckKind::Packages,
            format!("Missing packages: {}", missing.join(", ")),
        )
        .with_details(vec![format!("Install them with: zypper in {}", missing.join(" "))]);
    }

    if let Err(e) = output.check() {
        return CheckResult::from_error(
            CheckKind::Packages,
            "Package query failed",
            anyhow::Error::from(*e),
        );
    }

    CheckResult::pass(CheckKind::Packages, "Region server client is installed")
        .with_details(output.output().lines().map(String::from).collect())
}

/// Extracts the names of packages `rpm -q` reported as not installed.
fn missing_packages(rpm_output: &str) -> Vec<String> {
    rpm_output
        .lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix("package ")?
                .strip_suffix(" is not installed")
                .map(String::from)
        })
        .collect()
}

pub(super) fn check_metadata_tool(ctx: &CheckContext) -> CheckResult {
    check_binary(CheckKind::MetadataTool, ctx.framework.metadata_tool())
}

fn check_binary(check: CheckKind, binary: &str) -> CheckResult {
    match which::which(binary) {
        Ok(path) => {
            debug!("Found '{binary}' at '{}'", path.display());
            CheckResult::pass(check, format!("Found {}", path.display()))
        }
        Err(e) => CheckResult::fail(check, format!("'{binary}' not found: {e}")),
    }
}
