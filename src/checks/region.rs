use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use anyhow::{bail, Context, Error};
use log::debug;

use crate::config::{RegionServerConfig, REGION_SERVER_CONFIG_PATH};

use super::{CheckContext, CheckKind, CheckResult};

/// Region servers are only reachable over HTTPS.
const HTTPS_PORT: u16 = 443;

/// Loads the region server client configuration. On failure, the failed result is returned as
/// the error so the dependent checks can be skipped.
pub(super) fn load_config(
    ctx: &CheckContext,
) -> Result<(CheckResult, RegionServerConfig), CheckResult> {
    let config = RegionServerConfig::load(ctx.host_path(REGION_SERVER_CONFIG_PATH)).map_err(
        |e| {
            CheckResult::from_error(
                CheckKind::RegionConfig,
                "Region server configuration is unusable",
                e,
            )
        },
    )?;

    let result = CheckResult::pass(
        CheckKind::RegionConfig,
        format!("{} region server(s) configured", config.region_servers.len()),
    )
    .with_details(config.region_servers.clone());

    Ok((result, config))
}

pub(super) fn check_certs(ctx: &CheckContext, config: &RegionServerConfig) -> CheckResult {
    let missing: Vec<String> = config
        .region_servers
        .iter()
        .map(|server| config.cert_path(server))
        .filter(|cert| !ctx.host_path(cert).is_file())
        .map(|cert| format!("Missing certificate: {}", cert.display()))
        .collect();

    if missing.is_empty() {
        CheckResult::pass(
            CheckKind::RegionCerts,
            "Certificates present for all region servers",
        )
    } else {
        CheckResult::fail(
            CheckKind::RegionCerts,
            format!(
                "{} of {} region server certificate(s) missing",
                missing.len(),
                config.region_servers.len()
            ),
        )
        .with_details(missing)
    }
}

pub(super) fn check_connectivity(ctx: &CheckContext, config: &RegionServerConfig) -> CheckResult {
    let mut unreachable = Vec::new();
    for server in &config.region_servers {
        match try_connect(server, HTTPS_PORT, ctx.timeout) {
            Ok(()) => debug!("Region server '{server}' is reachable"),
            Err(e) => unreachable.push(format!("{server}: {e:#}")),
        }
    }

    let reachable = config.region_servers.len() - unreachable.len();
    if reachable == 0 {
        CheckResult::fail(
            CheckKind::RegionConnectivity,
            "No region server is reachable on port 443",
        )
        .with_details(unreachable)
    } else {
        CheckResult::pass(
            CheckKind::RegionConnectivity,
            format!(
                "{reachable} of {} region server(s) reachable",
                config.region_servers.len()
            ),
        )
        .with_details(unreachable)
    }
}

/// Opens, then drops, a TCP connection to `server` on `port`.
fn try_connect(server: &str, port: u16, timeout: Duration) -> Result<(), Error> {
    let mut addresses = (server, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve '{server}'"))?;
    let Some(address) = addresses.next() else {
        bail!("'{server}' resolved to no address");
    };

    TcpStream::connect_timeout(&address, timeout)
        .with_context(|| format!("Failed to connect to {address}"))?;
    Ok(())
}
