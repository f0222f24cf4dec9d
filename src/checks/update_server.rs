use std::net::{IpAddr, SocketAddr};

use anyhow::{ensure, Context, Error};
use const_format::formatcp;
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use osutils::hosts::{HostsFile, HOSTS_PATH};

use super::{CheckContext, CheckKind, CheckResult};

/// Health endpoint of the update server.
const HEALTH_PATH: &str = "/api/health/status";

/// State reported by a healthy update server.
const ONLINE_STATE: &str = "online";

#[derive(Debug, Deserialize)]
struct HealthStatus {
    state: String,
}

/// Looks up the update server in /etc/hosts. On failure, the failed result is returned as the
/// error so the health check can be skipped.
pub(super) fn check_hosts(ctx: &CheckContext) -> Result<(CheckResult, IpAddr), CheckResult> {
    let hostname = ctx.framework.update_server_hostname();
    let hosts = HostsFile::read_root(&ctx.root).map_err(|e| {
        CheckResult::from_error(
            CheckKind::UpdateServerHosts,
            formatcp!("Could not read {HOSTS_PATH}"),
            e,
        )
    })?;

    match hosts.addresses_for(&hostname).as_slice() {
        [] => Err(CheckResult::fail(
            CheckKind::UpdateServerHosts,
            format!("No entry for {hostname} in {HOSTS_PATH}"),
        )
        .with_details(vec![
            "The instance is not registered, run: registercloudguest --force-new".into(),
        ])),
        [address] => Ok((
            CheckResult::pass(
                CheckKind::UpdateServerHosts,
                format!("{hostname} resolves to {address}"),
            ),
            *address,
        )),
        addresses => Err(CheckResult::fail(
            CheckKind::UpdateServerHosts,
            format!("Conflicting entries for {hostname} in {HOSTS_PATH}"),
        )
        .with_details(addresses.iter().map(ToString::to_string).collect())),
    }
}

pub(super) fn check_health(ctx: &CheckContext, address: IpAddr) -> CheckResult {
    let hostname = ctx.framework.update_server_hostname();
    let url = format!("https://{hostname}{HEALTH_PATH}");

    // Self-signed infrastructure certificates; address pinned to the /etc/hosts entry.
    let client = Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(ctx.timeout)
        .resolve(&hostname, SocketAddr::new(address, 443))
        .build()
        .context("Failed to build HTTP client");

    match client.and_then(|client| query_health(&client, &url)) {
        Ok(()) => CheckResult::pass(
            CheckKind::UpdateServerHealth,
            format!("Update server {hostname} ({address}) is online"),
        ),
        Err(e) => CheckResult::from_error(
            CheckKind::UpdateServerHealth,
            format!("Update server {hostname} ({address}) is not healthy"),
            e,
        ),
    }
}

fn query_health(client: &Client, url: &str) -> Result<(), Error> {
    debug!("Querying update server health at '{url}'");
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request to '{url}' failed"))?;

    let status = response.status();
    ensure!(status.is_success(), "'{url}' returned HTTP status {status}");

    let body = response
        .text()
        .with_context(|| format!("Failed to read response from '{url}'"))?;
    let health: HealthStatus = serde_json::from_str(&body)
        .with_context(|| format!("Unexpected response from '{url}'"))?;
    ensure!(
        health.state == ONLINE_STATE,
        "Update server reports state '{}'",
        health.state
    );

    Ok(())
}
