use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Error};
use configparser::ini::Ini;

/// Location of the region server client configuration.
pub const REGION_SERVER_CONFIG_PATH: &str = "/etc/regionserverclnt.cfg";

/// Default directory holding the region server certificates.
pub const DEFAULT_CERT_LOCATION: &str = "/var/lib/regionService/certs";

/// Relevant settings from the region server client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionServerConfig {
    pub region_servers: Vec<String>,
    pub cert_location: PathBuf,
}

impl RegionServerConfig {
    /// Reads and parses the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read '{}'", path.as_ref().display()))?;
        Self::parse(contents)
            .with_context(|| format!("Failed to parse '{}'", path.as_ref().display()))
    }

    pub fn parse(contents: String) -> Result<Self, Error> {
        let mut ini = Ini::new_cs();
        ini.read(contents).map_err(|e| anyhow!(e))?;

        let region_servers: Vec<String> = ini
            .get("server", "regionsrv")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|server| !server.is_empty())
            .map(String::from)
            .collect();
        if region_servers.is_empty() {
            bail!("No region servers configured");
        }

        Ok(Self {
            region_servers,
            cert_location: ini
                .get("server", "certLocation")
                .filter(|location| !location.is_empty())
                .unwrap_or_else(|| DEFAULT_CERT_LOCATION.into())
                .into(),
        })
    }

    /// Path of the certificate of a region server.
    pub fn cert_path(&self, server: &str) -> PathBuf {
        self.cert_location.join(format!("{server}.pem"))
    }
}
