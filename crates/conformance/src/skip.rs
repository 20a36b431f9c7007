//! Scenario gating.
//!
//! Guards return a [`Gate`] so scenarios can distinguish "this cluster lacks
//! the capability, skip" from hard failures, which stay in the error
//! channel.

use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use probe::{ProbeError, ProbeOutcome, ResourceProbe};

use crate::gpu::GpuInventory;

/// Status ConfigMap maintained by k8s.io/autoscaler's cluster-autoscaler.
const AUTOSCALER_STATUS_CONFIGMAP: &str = "cluster-autoscaler-status";

/// Group/version served by a Karpenter installation.
const KARPENTER_GROUP_VERSION: &str = "karpenter.sh/v1";

/// Result of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// The capability is present; run the scenario.
    Run,
    /// The capability is absent; skip with the given reason.
    Skip(String),
}

impl Gate {
    /// Whether the scenario should be skipped.
    #[must_use]
    pub fn should_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Skip(reason) => write!(f, "skip: {reason}"),
        }
    }
}

/// Skip unless `group_version` is served by the API server.
///
/// # Errors
/// Returns [`ProbeError`] when discovery fails outright.
pub async fn unless_group_version(
    probe: &ResourceProbe,
    group_version: &str,
) -> Result<Gate, ProbeError> {
    match probe.group_version_served(group_version).await? {
        ProbeOutcome::Satisfied => Ok(Gate::Run),
        ProbeOutcome::Pending => Ok(Gate::Skip(format!("{group_version} is not served"))),
    }
}

/// Skip unless a supported cluster autoscaler is installed: either the
/// cluster-autoscaler status ConfigMap exists in `kube-system` or the
/// Karpenter API is served.
///
/// # Errors
/// Returns [`ProbeError`] when either detection call fails outright.
pub async fn unless_cluster_autoscaler(
    client: &Client,
    probe: &ResourceProbe,
) -> Result<Gate, ProbeError> {
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), "kube-system");
    if config_maps
        .get_opt(AUTOSCALER_STATUS_CONFIGMAP)
        .await?
        .is_some()
    {
        return Ok(Gate::Run);
    }
    if probe
        .group_version_served(KARPENTER_GROUP_VERSION)
        .await?
        .is_satisfied()
    {
        return Ok(Gate::Run);
    }
    Ok(Gate::Skip(
        "no supported cluster autoscaler is installed".to_string(),
    ))
}

/// Skip unless the API server reports at least the given version.
///
/// # Errors
/// Returns [`ProbeError`] when the version cannot be read or parsed.
pub async fn unless_server_at_least(
    client: &Client,
    major: u32,
    minor: u32,
) -> Result<Gate, ProbeError> {
    let info = client.apiserver_version().await?;
    let (have_major, have_minor) = parse_version(&info.major, &info.minor).ok_or_else(|| {
        ProbeError::Malformed(format!(
            "unparseable server version {}.{}",
            info.major, info.minor
        ))
    })?;
    Ok(if (have_major, have_minor) >= (major, minor) {
        Gate::Run
    } else {
        Gate::Skip(format!(
            "server v{have_major}.{have_minor} is older than required v{major}.{minor}"
        ))
    })
}

/// Skip unless the inventory counts at least `min` accelerators, both in
/// capacity and allocatable.
#[must_use]
pub fn unless_gpus(inventory: &GpuInventory, min: i64) -> Gate {
    if inventory.capacity < min {
        return Gate::Skip(format!(
            "{} ready nodes expose {} accelerators in capacity, need {min}",
            inventory.nodes, inventory.capacity
        ));
    }
    if inventory.allocatable < min {
        return Gate::Skip(format!(
            "{} ready nodes expose {} allocatable accelerators, need {min}",
            inventory.nodes, inventory.allocatable
        ));
    }
    Gate::Run
}

fn parse_version(major: &str, minor: &str) -> Option<(u32, u32)> {
    let strip = |field: &str| {
        field
            .trim_end_matches(|c: char| !c.is_ascii_digit())
            .parse()
            .ok()
    };
    Some((strip(major)?, strip(minor)?))
}
