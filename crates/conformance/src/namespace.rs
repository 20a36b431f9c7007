//! Namespace cleanup between conformance runs.

use anyhow::{Context, Result};
use futures::future::join_all;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, ListParams};
use kube::Client;
use tracing::info;

/// Filters selecting namespaces for deletion. The skip filter always wins;
/// the delete filters act as conjunctive constraints when non-empty.
#[derive(Debug, Clone, Default)]
pub struct NamespaceFilters {
    /// Substrings: a namespace whose name contains any is a candidate.
    pub delete: Vec<String>,
    /// Label keys: a namespace carrying any is a candidate.
    pub delete_labels: Vec<String>,
    /// Substrings: a namespace whose name contains any is never deleted.
    pub skip: Vec<String>,
}

/// Delete all namespaces matching the filters, concurrently. Returns the
/// names whose deletion was requested.
///
/// # Errors
/// Returns an error when listing fails or any deletion call fails.
pub async fn delete_namespaces(
    client: &Client,
    filters: &NamespaceFilters,
) -> Result<Vec<String>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default())
        .await
        .context("Failed to list namespaces")?;

    let doomed: Vec<String> = list
        .items
        .iter()
        .filter(|namespace| should_delete(namespace, filters))
        .filter_map(|namespace| namespace.metadata.name.clone())
        .collect();

    let deletions = doomed.iter().map(|name| {
        let api = api.clone();
        async move { api.delete(name, &DeleteParams::default()).await.map(|_| ()) }
    });
    let results = join_all(deletions).await;
    for (name, result) in doomed.iter().zip(results) {
        result.with_context(|| format!("Failed to delete namespace {name}"))?;
        info!(namespace = %name, "namespace deletion requested");
    }
    Ok(doomed)
}

fn should_delete(namespace: &Namespace, filters: &NamespaceFilters) -> bool {
    let name = namespace.metadata.name.as_deref().unwrap_or_default();
    if filters
        .skip
        .iter()
        .any(|pattern| name.contains(pattern.as_str()))
    {
        return false;
    }
    if !filters.delete.is_empty()
        && !filters
            .delete
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    {
        return false;
    }
    if !filters.delete_labels.is_empty() {
        let has_label = namespace
            .metadata
            .labels
            .as_ref()
            .is_some_and(|labels| filters.delete_labels.iter().any(|key| labels.contains_key(key)));
        if !has_label {
            return false;
        }
    }
    true
}
