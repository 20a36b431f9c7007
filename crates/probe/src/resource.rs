//! Point-in-time probes of cluster state.
//!
//! [`ResourceProbe`] answers single questions: is an API group/version
//! served, does an object carry a status condition with a given value, does
//! an object (still) exist. Discovery answers are cached; object state is
//! re-read on every invocation.

use kube::api::{Api, DynamicObject};
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::Value;
use tracing::debug;

use crate::discovery::{ApiServerDiscovery, DiscoveryCache};
use crate::error::ProbeError;
use crate::wait::ProbeOutcome;

/// Identifies a cluster object to probe. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// API group; empty for the core group.
    pub group: String,
    /// API version within the group.
    pub version: String,
    /// Object kind.
    pub kind: String,
    /// Lowercase plural resource name.
    pub plural: String,
    /// Namespace; `None` for cluster-scoped objects.
    pub namespace: Option<String>,
    /// Object name.
    pub name: String,
}

impl ResourceRef {
    /// Reference a cluster-scoped object.
    #[must_use]
    pub fn cluster_scoped(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
            namespace: None,
            name: name.into(),
        }
    }

    /// Reference a namespaced object.
    #[must_use]
    pub fn namespaced(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::cluster_scoped(group, version, kind, plural, name)
        }
    }

    /// The `group/version` string, or bare version for the core group.
    #[must_use]
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.group_version(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

/// Read-only prober over a cluster client.
///
/// Owns its [`DiscoveryCache`]; construct a fresh probe to observe APIs
/// installed after the cache was populated.
pub struct ResourceProbe {
    client: Client,
    source: ApiServerDiscovery,
    cache: DiscoveryCache,
}

impl ResourceProbe {
    /// Create a probe with an empty discovery cache.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            source: ApiServerDiscovery::new(client.clone()),
            cache: DiscoveryCache::new(),
            client,
        }
    }

    /// Whether `group_version` is served by the API server.
    ///
    /// The answer is cached per probe instance; object-level probes below
    /// are never cached.
    ///
    /// # Errors
    /// Returns [`ProbeError`] when discovery fails for a reason other than
    /// the group/version not being found.
    pub async fn group_version_served(
        &self,
        group_version: &str,
    ) -> Result<ProbeOutcome, ProbeError> {
        let served = self.cache.served(&self.source, group_version).await?;
        Ok(if served {
            ProbeOutcome::Satisfied
        } else {
            ProbeOutcome::Pending
        })
    }

    /// Whether the referenced object carries `condition_type` with
    /// `want_status` in `.status.conditions`.
    ///
    /// An object that does not exist yet reports
    /// [`ProbeOutcome::Pending`] rather than an error: conditions appear
    /// after creation and deletion windows are expected while polling.
    ///
    /// # Errors
    /// Returns [`ProbeError`] when reading the object fails.
    pub async fn object_condition(
        &self,
        reference: &ResourceRef,
        condition_type: &str,
        want_status: &str,
    ) -> Result<ProbeOutcome, ProbeError> {
        let Some(object) = self.get_opt(reference).await? else {
            debug!(
                kind = %reference.kind,
                name = %reference.name,
                "object not found, condition pending"
            );
            return Ok(ProbeOutcome::Pending);
        };
        Ok(
            if condition_matches(&object.data, condition_type, want_status) {
                ProbeOutcome::Satisfied
            } else {
                ProbeOutcome::Pending
            },
        )
    }

    /// Whether the referenced object exists.
    ///
    /// # Errors
    /// Returns [`ProbeError`] when the read fails for a reason other than
    /// the object being absent.
    pub async fn object_exists(&self, reference: &ResourceRef) -> Result<ProbeOutcome, ProbeError> {
        Ok(match self.get_opt(reference).await? {
            Some(_) => ProbeOutcome::Satisfied,
            None => ProbeOutcome::Pending,
        })
    }

    /// Whether the referenced object is gone; confirms deletion and
    /// reclamation.
    ///
    /// # Errors
    /// Returns [`ProbeError`] when the read fails for a reason other than
    /// the object being absent.
    pub async fn object_absent(&self, reference: &ResourceRef) -> Result<ProbeOutcome, ProbeError> {
        Ok(match self.get_opt(reference).await? {
            Some(_) => ProbeOutcome::Pending,
            None => ProbeOutcome::Satisfied,
        })
    }

    async fn get_opt(&self, reference: &ResourceRef) -> Result<Option<DynamicObject>, ProbeError> {
        let resource = reference.api_resource();
        let api: Api<DynamicObject> = match &reference.namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        };
        Ok(api.get_opt(&reference.name).await?)
    }
}

/// Scan `.status.conditions` for an entry with the given type and status.
fn condition_matches(data: &Value, condition_type: &str, want_status: &str) -> bool {
    data.get("status")
        .and_then(|status| status.get("conditions"))
        .and_then(Value::as_array)
        .is_some_and(|conditions| {
            conditions.iter().any(|condition| {
                condition.get("type").and_then(Value::as_str) == Some(condition_type)
                    && condition.get("status").and_then(Value::as_str) == Some(want_status)
            })
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn group_version_formats() {
        let crd = ResourceRef::cluster_scoped(
            "apiextensions.k8s.io",
            "v1",
            "CustomResourceDefinition",
            "customresourcedefinitions",
            "gateways.gateway.networking.k8s.io",
        );
        assert_eq!(crd.group_version(), "apiextensions.k8s.io/v1");

        let node = ResourceRef::cluster_scoped("", "v1", "Node", "nodes", "worker-0");
        assert_eq!(node.group_version(), "v1");
    }

    #[test]
    fn namespaced_ref_keeps_namespace() {
        let pod = ResourceRef::namespaced("", "v1", "Pod", "pods", "workloads", "trainer-0");
        assert_eq!(pod.namespace.as_deref(), Some("workloads"));
        assert_eq!(pod.name, "trainer-0");
    }

    #[test]
    fn condition_matches_established_crd() {
        let data = json!({
            "status": {
                "conditions": [
                    {"type": "NamesAccepted", "status": "True"},
                    {"type": "Established", "status": "True"},
                ]
            }
        });
        assert!(condition_matches(&data, "Established", "True"));
        assert!(condition_matches(&data, "NamesAccepted", "True"));
    }

    #[test]
    fn condition_mismatch_on_status_value() {
        let data = json!({
            "status": {
                "conditions": [
                    {"type": "Established", "status": "False", "reason": "Installing"},
                ]
            }
        });
        assert!(!condition_matches(&data, "Established", "True"));
    }

    #[test]
    fn condition_absent_when_status_missing() {
        assert!(!condition_matches(&json!({}), "Established", "True"));
        assert!(!condition_matches(
            &json!({"status": {}}),
            "Established",
            "True"
        ));
        assert!(!condition_matches(
            &json!({"status": {"conditions": []}}),
            "Established",
            "True"
        ));
    }
}
