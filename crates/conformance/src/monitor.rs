//! Prometheus operator integration.
//!
//! ServiceMonitors and Prometheus instances are foreign CRDs, handled as
//! dynamic objects rather than generated types.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Group/version served by the Prometheus operator.
pub const MONITORING_GROUP_VERSION: &str = "monitoring.coreos.com/v1";

fn prometheus_api() -> ApiResource {
    ApiResource {
        group: "monitoring.coreos.com".to_string(),
        version: "v1".to_string(),
        api_version: MONITORING_GROUP_VERSION.to_string(),
        kind: "Prometheus".to_string(),
        plural: "prometheuses".to_string(),
    }
}

fn service_monitor_api() -> ApiResource {
    ApiResource {
        group: "monitoring.coreos.com".to_string(),
        version: "v1".to_string(),
        api_version: MONITORING_GROUP_VERSION.to_string(),
        kind: "ServiceMonitor".to_string(),
        plural: "servicemonitors".to_string(),
    }
}

/// A Prometheus instance discovered in the cluster.
#[derive(Debug, Clone)]
pub struct PrometheusInstance {
    /// Instance name.
    pub name: String,
    /// Instance namespace.
    pub namespace: String,
    /// Labels a ServiceMonitor must carry to be selected by this instance.
    pub monitor_selector: BTreeMap<String, String>,
    /// Namespace labels required for monitor discovery; `None` means the
    /// operator only watches its own namespace.
    pub monitor_namespace_selector: Option<BTreeMap<String, String>>,
}

/// Location of a created ServiceMonitor, for later deletion.
#[derive(Debug, Clone)]
pub struct ServiceMonitorRef {
    /// Namespace the monitor was created in.
    pub namespace: String,
    /// Monitor name.
    pub name: String,
}

/// The first Prometheus instance found in any namespace.
///
/// # Errors
/// Returns an error when listing instances fails; a cluster without any is
/// `Ok(None)`.
pub async fn first_prometheus(client: &Client) -> Result<Option<PrometheusInstance>> {
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &prometheus_api());
    let list = api
        .list(&ListParams::default())
        .await
        .context("Failed to list Prometheus instances")?;

    let Some(object) = list.items.into_iter().next() else {
        return Ok(None);
    };

    let spec = object.data.get("spec");
    let instance = PrometheusInstance {
        name: object.metadata.name.clone().unwrap_or_default(),
        namespace: object.metadata.namespace.clone().unwrap_or_default(),
        monitor_selector: match_labels(
            spec.and_then(|spec| spec.get("serviceMonitorSelector")),
        )
        .unwrap_or_default(),
        monitor_namespace_selector: match_labels(
            spec.and_then(|spec| spec.get("serviceMonitorNamespaceSelector")),
        ),
    };
    debug!(
        name = %instance.name,
        namespace = %instance.namespace,
        "found Prometheus instance"
    );
    Ok(Some(instance))
}

/// Create a ServiceMonitor scraping services labeled `match_labels` in
/// `namespace`.
///
/// When the Prometheus instance restricts monitor namespaces with a label
/// selector, the target namespace is patched with those labels and the
/// monitor is created there; otherwise the monitor lands in the Prometheus
/// namespace, which the operator always watches.
///
/// # Errors
/// Returns an error when the namespace patch or the create call fails.
pub async fn create_service_monitor(
    client: &Client,
    prometheus: &PrometheusInstance,
    namespace: &str,
    name: &str,
    match_labels: &BTreeMap<String, String>,
    port: &str,
) -> Result<ServiceMonitorRef> {
    let mut monitor_namespace = namespace.to_string();
    match &prometheus.monitor_namespace_selector {
        Some(namespace_labels) => {
            if !namespace_labels.is_empty() {
                let namespaces: Api<Namespace> = Api::all(client.clone());
                let patch = json!({"metadata": {"labels": namespace_labels}});
                namespaces
                    .patch(namespace, &PatchParams::default(), &Patch::Merge(&patch))
                    .await
                    .with_context(|| {
                        format!("Failed to label namespace {namespace} for monitor discovery")
                    })?;
            }
        }
        None => {
            monitor_namespace = prometheus.namespace.clone();
        }
    }

    let body = json!({
        "apiVersion": MONITORING_GROUP_VERSION,
        "kind": "ServiceMonitor",
        "metadata": {
            "name": name,
            "labels": prometheus.monitor_selector,
        },
        "spec": {
            "namespaceSelector": {"matchNames": [namespace]},
            "selector": {"matchLabels": match_labels},
            "endpoints": [
                {"port": port, "interval": "15s", "path": "/metrics"},
            ],
        },
    });
    let object: DynamicObject =
        serde_json::from_value(body).context("Failed to build ServiceMonitor object")?;

    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &monitor_namespace, &service_monitor_api());
    api.create(&PostParams::default(), &object)
        .await
        .context("Failed to create ServiceMonitor")?;

    info!(namespace = %monitor_namespace, name, "created ServiceMonitor");
    Ok(ServiceMonitorRef {
        namespace: monitor_namespace,
        name: name.to_string(),
    })
}

/// Delete a previously created ServiceMonitor.
///
/// # Errors
/// Returns an error when the delete call fails.
pub async fn delete_service_monitor(client: &Client, monitor: &ServiceMonitorRef) -> Result<()> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &monitor.namespace, &service_monitor_api());
    api.delete(&monitor.name, &DeleteParams::default())
        .await
        .with_context(|| {
            format!(
                "Failed to delete ServiceMonitor {}/{}",
                monitor.namespace, monitor.name
            )
        })?;
    Ok(())
}

fn match_labels(selector: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let selector = selector?;
    let labels = selector
        .get("matchLabels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(key, value)| {
                    value
                        .as_str()
                        .map(|value| (key.clone(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    Some(labels)
}
