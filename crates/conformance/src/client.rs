//! Kubernetes client construction.

use std::path::Path;

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::config::TestConfig;

/// Build a cluster client from the harness configuration.
///
/// # Errors
/// Returns an error when the kubeconfig cannot be read or no client
/// configuration can be inferred from the environment.
pub async fn cluster_client(config: &TestConfig) -> Result<Client> {
    match &config.kubeconfig {
        Some(path) => client_from_kubeconfig(path).await,
        None => Client::try_default()
            .await
            .context("Failed to infer Kubernetes client configuration"),
    }
}

/// Build a cluster client from an explicit kubeconfig file.
///
/// # Errors
/// Returns an error when the file cannot be read or the client cannot be
/// created from it.
pub async fn client_from_kubeconfig(path: &Path) -> Result<Client> {
    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("Failed to read kubeconfig from {}", path.display()))?;

    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("Failed to create Kubernetes config from kubeconfig")?;

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// The API server's (major, minor) version.
///
/// # Errors
/// Returns an error when the version endpoint is unreachable or the
/// reported version does not parse.
pub async fn server_version(client: &Client) -> Result<(u32, u32)> {
    let info = client
        .apiserver_version()
        .await
        .context("Failed to read API server version")?;
    let major = parse_version_field(&info.major)
        .with_context(|| format!("Unparseable major version {:?}", info.major))?;
    let minor = parse_version_field(&info.minor)
        .with_context(|| format!("Unparseable minor version {:?}", info.minor))?;
    Ok((major, minor))
}

/// Some distributions suffix the minor version, e.g. `"31+"`.
fn parse_version_field(field: &str) -> Option<u32> {
    field
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .ok()
}
