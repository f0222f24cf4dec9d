use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Error};
use const_format::formatcp;

use osutils::path;

use super::{CheckContext, CheckKind, CheckResult};

/// Credentials written by the registration.
const CREDENTIALS_PATH: &str = "/etc/zypp/credentials.d/SCCcredentials";

/// Symlink to the product definition of the installed base product.
const BASE_PRODUCT_PATH: &str = "/etc/products.d/baseproduct";

pub(super) fn check_credentials(ctx: &CheckContext) -> CheckResult {
    let contents = match std::fs::read_to_string(ctx.host_path(CREDENTIALS_PATH)) {
        Ok(contents) => contents,
        Err(e) => {
            return CheckResult::fail(
                CheckKind::Credentials,
                formatcp!("Could not read {CREDENTIALS_PATH}"),
            )
            .with_details(vec![
                e.to_string(),
                "The instance is not registered, run: registercloudguest --force-new".into(),
            ])
        }
    };

    let missing: Vec<&str> = ["username", "password"]
        .into_iter()
        .filter(|key| credential_value(&contents, key).is_none())
        .collect();

    if missing.is_empty() {
        CheckResult::pass(CheckKind::Credentials, "Registration credentials present")
    } else {
        CheckResult::fail(
            CheckKind::Credentials,
            format!("{CREDENTIALS_PATH} has no {}", missing.join(" and ")),
        )
    }
}

/// Looks up a non-empty `key=value` entry.
fn credential_value<'a>(contents: &'a str, key: &str) -> Option<&'a str> {
    contents.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key && !v.trim().is_empty()).then(|| v.trim())
    })
}

pub(super) fn check_base_product(ctx: &CheckContext) -> CheckResult {
    match base_product_target(&ctx.root) {
        Ok(target) => CheckResult::pass(
            CheckKind::BaseProduct,
            format!("{BASE_PRODUCT_PATH} points to {}", target.display()),
        ),
        Err(e) => CheckResult::from_error(CheckKind::BaseProduct, "Base product is broken", e),
    }
}

/// Resolves the base product symlink, relative to the host root, and checks its target exists.
fn base_product_target(root: &Path) -> Result<PathBuf, Error> {
    let link = path::join_relative(root, BASE_PRODUCT_PATH);
    let metadata = std::fs::symlink_metadata(&link)
        .with_context(|| format!("Failed to inspect '{BASE_PRODUCT_PATH}'"))?;
    ensure!(
        metadata.file_type().is_symlink(),
        "'{BASE_PRODUCT_PATH}' is not a symlink"
    );

    let target = std::fs::read_link(&link)
        .with_context(|| format!("Failed to read link '{BASE_PRODUCT_PATH}'"))?;
    let host_target = if target.is_absolute() {
        path::join_relative(root, &target)
    } else {
        // Relative links are relative to the directory of the link
        link.parent().unwrap_or(root).join(&target)
    };
    ensure!(
        host_target.exists(),
        "'{BASE_PRODUCT_PATH}' points to missing '{}'",
        target.display()
    );

    Ok(target)
}
