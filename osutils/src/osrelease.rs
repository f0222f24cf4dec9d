use std::path::Path;

use anyhow::{Context, Error};
use log::trace;

use crate::path;

/// Absolute path to the /etc/os-release file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Values of `ID` for the SUSE enterprise products served by the public cloud update
/// infrastructure.
const SUSE_ENTERPRISE_IDS: &[&str] = &["sles", "sles_sap", "sle_hpc", "sle-micro"];

/// Represents the contents of the /etc/os-release file.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub version_id: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Reads the contents of /\<root\>/etc/os-release and parses it into an OsRelease struct.
    pub fn read_root(root: impl AsRef<Path>) -> Result<Self, Error> {
        let osrelease_path = path::join_relative(root, OS_RELEASE_PATH);
        Ok(Self::parse(
            &std::fs::read_to_string(&osrelease_path)
                .with_context(|| format!("Failed to read '{}'", osrelease_path.display()))?,
        ))
    }

    /// Returns the distribution of the host.
    pub fn get_distro(&self) -> Distro {
        match self.id.as_deref() {
            Some(id) if SUSE_ENTERPRISE_IDS.contains(&id) => Distro::SuseEnterprise,
            Some(id) => {
                trace!("Distribution '{id}' is not a SUSE enterprise product");
                Distro::Other
            }
            None => Distro::Other,
        }
    }

    /// Returns a human readable description of the distribution.
    pub fn describe(&self) -> String {
        self.pretty_name
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "unknown distribution".into())
    }

    /// Parses the input string into an OsRelease struct.
    pub fn parse(data: &str) -> Self {
        let mut os_release = OsRelease::default();
        for line in data.lines() {
            if line.is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            let Some((key, raw_value)) = line.trim().split_once('=') else {
                continue;
            };

            // Fn to trim whitespace and quotes from value, and return as
            // Option<String>
            let value = || {
                Some(
                    raw_value
                        .trim()
                        .trim_matches('\"')
                        .trim_matches('\'')
                        .to_string(),
                )
            };

            match key {
                "ID" => os_release.id = value(),
                "NAME" => os_release.name = value(),
                "VERSION" => os_release.version = value(),
                "VERSION_ID" => os_release.version_id = value(),
                "PRETTY_NAME" => os_release.pretty_name = value(),
                _ => {}
            }
        }

        os_release
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    SuseEnterprise,
    Other,
}

impl Distro {
    pub fn is_suse_enterprise(&self) -> bool {
        matches!(self, Distro::SuseEnterprise)
    }
}
