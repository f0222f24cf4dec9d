//! Detection of the public cloud framework the instance runs on.

use log::debug;
use serde::Serialize;
use strum_macros::{Display, EnumIter};

use osutils::dependencies::{Command, Dependency, DependencyError};

/// Vendor strings found in the DMI tables, in matching priority order.
const SIGNATURES: &[(&str, Framework)] = &[
    ("microsoft", Framework::Azure),
    ("amazon", Framework::Ec2),
    ("google", Framework::Gce),
];

/// The public cloud framework hosting the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Azure,
    Ec2,
    Gce,
}

impl Framework {
    /// Name of the framework specific plugin package of the region server client.
    pub fn plugin_package(&self) -> String {
        format!("cloud-regionsrv-client-plugin-{self}")
    }

    /// Binary used by the region server client to collect instance metadata.
    pub fn metadata_tool(&self) -> &'static str {
        match self {
            Framework::Azure => "azuremetadata",
            Framework::Ec2 => "ec2metadata",
            Framework::Gce => "gcemetadata",
        }
    }

    /// Hostname of the update server, as written to /etc/hosts on registration.
    pub fn update_server_hostname(&self) -> String {
        format!("smt-{self}.susecloud.net")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("{tool} binary not found")]
    ToolNotFound {
        tool: Dependency,
        #[source]
        source: which::Error,
    },

    #[error("{tool} error: {explanation}{}", stderr_suffix(.stderr))]
    ToolExecution {
        tool: Dependency,
        explanation: String,
        /// What the tool wrote on stderr, such as a permission error when not run as root.
        stderr: String,
    },

    #[error("No supported framework")]
    UnsupportedFramework,
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.lines().next() {
        Some(first) => format!(": {first}"),
        None => String::new(),
    }
}

impl From<Box<DependencyError>> for FrameworkError {
    fn from(value: Box<DependencyError>) -> Self {
        match *value {
            DependencyError::NotFound { dependency, source } => FrameworkError::ToolNotFound {
                tool: dependency,
                source,
            },
            DependencyError::CouldNotExecute { dependency, inner } => {
                FrameworkError::ToolExecution {
                    tool: dependency,
                    explanation: inner.to_string(),
                    stderr: String::new(),
                }
            }
            DependencyError::ExecutionFailed {
                dependency,
                explanation,
                stderr,
                ..
            } => FrameworkError::ToolExecution {
                tool: dependency,
                explanation,
                stderr,
            },
        }
    }
}

/// Detects the framework by matching vendor strings in the output of dmidecode.
///
/// A non-zero dmidecode exit is a [`FrameworkError::ToolExecution`]; its output is not classified.
pub fn detect_framework() -> Result<Framework, FrameworkError> {
    detect_with(&Dependency::Dmidecode.cmd())
}

fn detect_with(cmd: &Command) -> Result<Framework, FrameworkError> {
    let output = cmd.output_and_check()?;
    let framework = classify(&output)?;
    debug!("Detected framework: {framework}");
    Ok(framework)
}

/// Classifies DMI output. The first vendor string found, in priority order, wins.
pub fn classify(dmi_output: &str) -> Result<Framework, FrameworkError> {
    let dmi_output = dmi_output.to_lowercase();
    SIGNATURES
        .iter()
        .find(|(vendor, _)| dmi_output.contains(vendor))
        .map(|(_, framework)| *framework)
        .ok_or(FrameworkError::UnsupportedFramework)
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;
    use strum::IntoEnumIterator;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("...Manufacturer: Microsoft Corporation...").unwrap(),
            Framework::Azure
        );
        assert_eq!(classify("...Amazon EC2...").unwrap(), Framework::Ec2);
        assert_eq!(
            classify("...Google Compute Engine...").unwrap(),
            Framework::Gce
        );
        assert!(matches!(
            classify("...Generic Hardware Inc...").unwrap_err(),
            FrameworkError::UnsupportedFramework
        ));
        assert!(matches!(
            classify("").unwrap_err(),
            FrameworkError::UnsupportedFramework
        ));
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("MICROSOFT").unwrap(), Framework::Azure);
        assert_eq!(classify("xxAmAzOnxx").unwrap(), Framework::Ec2);
        assert_eq!(classify("gOOgle").unwrap(), Framework::Gce);
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify("Google Amazon Microsoft").unwrap(),
            Framework::Azure
        );
        assert_eq!(classify("Google Amazon").unwrap(), Framework::Ec2);
        assert_eq!(classify("amazon google").unwrap(), Framework::Ec2);
    }

    #[test]
    fn test_classify_dmidecode_output() {
        let output = indoc! {"
            # dmidecode 3.4
            Getting SMBIOS data from sysfs.
            SMBIOS 2.3 present.

            Handle 0x0001, DMI type 1, 27 bytes
            System Information
            	Manufacturer: Microsoft Corporation
            	Product Name: Virtual Machine
            	Version: 7.0
        "};
        assert_eq!(classify(output).unwrap(), Framework::Azure);
    }

    #[test]
    fn test_detect_with() {
        let cmd = Dependency::Echo.cmd().with_arg("Manufacturer: Amazon EC2");
        assert_eq!(detect_with(&cmd).unwrap(), Framework::Ec2);

        let cmd = Dependency::Echo.cmd().with_arg("Generic Hardware Inc");
        assert!(matches!(
            detect_with(&cmd).unwrap_err(),
            FrameworkError::UnsupportedFramework
        ));
    }

    #[test]
    fn test_detect_with_missing_tool() {
        let err = detect_with(&Dependency::DoesNotExist.cmd()).unwrap_err();
        assert!(matches!(
            err,
            FrameworkError::ToolNotFound {
                tool: Dependency::DoesNotExist,
                ..
            }
        ));
        assert_eq!(err.to_string(), "doesnotexist binary not found");
    }

    #[test]
    fn test_detect_with_failing_tool() {
        let err = detect_with(&Dependency::False.cmd()).unwrap_err();
        assert!(matches!(
            err,
            FrameworkError::ToolExecution {
                tool: Dependency::False,
                ..
            }
        ));
        assert_eq!(err.to_string(), "false error: exited with status: 1");
    }

    #[test]
    fn test_detect_with_tool_stderr() {
        // dmidecode run without root privileges fails on the DMI tables
        let mut cmd = Dependency::Sh.cmd();
        cmd.args([
            "-c",
            "echo 'Manufacturer: Google'; echo 'smbios_entry_point: Permission denied' >&2; \
             echo 'second line' >&2; exit 1",
        ]);
        let err = detect_with(&cmd).unwrap_err();
        match &err {
            FrameworkError::ToolExecution { tool, stderr, .. } => {
                assert_eq!(*tool, Dependency::Sh);
                assert_eq!(stderr, "smbios_entry_point: Permission denied\nsecond line");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "sh error: exited with status: 1: smbios_entry_point: Permission denied"
        );
    }

    #[test]
    fn test_framework_specifics() {
        assert_eq!(Framework::Azure.to_string(), "azure");
        assert_eq!(
            Framework::Ec2.plugin_package(),
            "cloud-regionsrv-client-plugin-ec2"
        );
        assert_eq!(Framework::Gce.metadata_tool(), "gcemetadata");
        assert_eq!(
            Framework::Azure.update_server_hostname(),
            "smt-azure.susecloud.net"
        );
        assert_eq!(
            serde_json::to_string(&Framework::Ec2).unwrap(),
            "\"ec2\""
        );

        for framework in Framework::iter() {
            let vendor = SIGNATURES
                .iter()
                .find(|(_, f)| *f == framework)
                .map(|(vendor, _)| *vendor)
                .unwrap();
            assert_eq!(classify(vendor).unwrap(), framework);
        }
    }
}
