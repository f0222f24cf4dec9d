use std::{net::IpAddr, path::Path};

use anyhow::{Context, Error};
use log::trace;

use crate::path;

/// Absolute path to the /etc/hosts file.
pub const HOSTS_PATH: &str = "/etc/hosts";

/// A representation of a hosts file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HostsFile {
    pub entries: Vec<HostsEntry>,
}

/// A representation of a single line of a hosts file.
#[derive(Debug, PartialEq, Eq)]
pub struct HostsEntry {
    pub address: IpAddr,
    pub names: Vec<String>,
}

impl HostsFile {
    /// Reads /\<root\>/etc/hosts.
    pub fn read_root(root: impl AsRef<Path>) -> Result<Self, Error> {
        let hosts_path = path::join_relative(root, HOSTS_PATH);
        Ok(Self::parse(
            &std::fs::read_to_string(&hosts_path)
                .with_context(|| format!("Failed to read '{}'", hosts_path.display()))?,
        ))
    }

    /// Parses the contents of a hosts file. Lines that do not start with a valid address are
    /// skipped.
    pub fn parse(data: &str) -> Self {
        let entries = data
            .lines()
            .filter_map(|line| {
                let line = match line.split_once('#') {
                    Some((content, _)) => content,
                    None => line,
                };

                let mut fields = line.split_whitespace();
                let address = fields.next()?;
                let Ok(address) = address.parse() else {
                    trace!("Skipping hosts entry with invalid address '{address}'");
                    return None;
                };

                let names: Vec<String> = fields.map(String::from).collect();
                if names.is_empty() {
                    return None;
                }

                Some(HostsEntry { address, names })
            })
            .collect();

        Self { entries }
    }

    /// Returns every address mapped to `name`, in file order, without duplicates.
    pub fn addresses_for(&self, name: &str) -> Vec<IpAddr> {
        let mut addresses = Vec::new();
        for entry in &self.entries {
            if entry.names.iter().any(|n| n.eq_ignore_ascii_case(name))
                && !addresses.contains(&entry.address)
            {
                addresses.push(entry.address);
            }
        }
        addresses
    }
}
