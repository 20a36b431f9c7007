//! CRD readiness checks.

use probe::{wait_for, ProbeOutcome, ResourceProbe, ResourceRef, WaitError, WaitSpec};

/// Condition set by the API server once a CRD is served.
const ESTABLISHED: &str = "Established";

/// Condition set once the CRD's names are free of conflicts.
const NAMES_ACCEPTED: &str = "NamesAccepted";

/// CRDs a conforming Gateway API installation serves.
pub const GATEWAY_CRDS: [&str; 5] = [
    "gatewayclasses.gateway.networking.k8s.io",
    "gateways.gateway.networking.k8s.io",
    "httproutes.gateway.networking.k8s.io",
    "grpcroutes.gateway.networking.k8s.io",
    "referencegrants.gateway.networking.k8s.io",
];

/// Reference to a cluster-scoped CustomResourceDefinition.
#[must_use]
pub fn crd_ref(name: &str) -> ResourceRef {
    ResourceRef::cluster_scoped(
        "apiextensions.k8s.io",
        "v1",
        "CustomResourceDefinition",
        "customresourcedefinitions",
        name,
    )
}

/// Wait until the named CRD is both Established and NamesAccepted.
///
/// # Errors
/// Returns [`WaitError::Timeout`] when the CRD never becomes ready, or
/// [`WaitError::Probe`] when reading it fails.
pub async fn wait_for_crd_established(
    probe: &ResourceProbe,
    spec: &WaitSpec,
    name: &str,
) -> Result<(), WaitError> {
    let reference = crd_ref(name);
    let reference = &reference;
    wait_for(spec, move || async move {
        let established = probe
            .object_condition(reference, ESTABLISHED, "True")
            .await?;
        if !established.is_satisfied() {
            return Ok(ProbeOutcome::Pending);
        }
        probe
            .object_condition(reference, NAMES_ACCEPTED, "True")
            .await
    })
    .await
}
