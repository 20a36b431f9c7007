//! Accelerator inventory over cluster nodes.

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::{Api, Client};
use probe::ProbeError;
use tracing::debug;

/// Aggregate accelerator counts across ready nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuInventory {
    /// Devices in node capacity.
    pub capacity: i64,
    /// Devices currently allocatable.
    pub allocatable: i64,
    /// Ready nodes inspected.
    pub nodes: usize,
}

/// Sum the named extended resource over all ready nodes.
///
/// # Errors
/// Returns [`ProbeError`] when listing nodes fails.
pub async fn inventory(client: &Client, resource_name: &str) -> Result<GpuInventory, ProbeError> {
    let nodes: Api<Node> = Api::all(client.clone());
    let list = nodes.list(&ListParams::default()).await?;

    let mut inventory = GpuInventory::default();
    for node in list.items.iter().filter(|node| is_ready(node)) {
        inventory.nodes += 1;
        inventory.capacity += resource_count(node, resource_name, Counter::Capacity);
        inventory.allocatable += resource_count(node, resource_name, Counter::Allocatable);
    }
    debug!(
        resource = resource_name,
        capacity = inventory.capacity,
        allocatable = inventory.allocatable,
        nodes = inventory.nodes,
        "accelerator inventory"
    );
    Ok(inventory)
}

/// Name of the first ready node with at least `min` of the resource in both
/// capacity and allocatable, or `None`.
///
/// # Errors
/// Returns [`ProbeError`] when listing nodes fails.
pub async fn node_with_allocatable(
    client: &Client,
    resource_name: &str,
    min: i64,
) -> Result<Option<String>, ProbeError> {
    let nodes: Api<Node> = Api::all(client.clone());
    let list = nodes.list(&ListParams::default()).await?;

    Ok(list
        .items
        .iter()
        .filter(|node| is_ready(node))
        .find(|node| {
            resource_count(node, resource_name, Counter::Capacity) >= min
                && resource_count(node, resource_name, Counter::Allocatable) >= min
        })
        .and_then(|node| node.metadata.name.clone()))
}

enum Counter {
    Capacity,
    Allocatable,
}

fn resource_count(node: &Node, resource_name: &str, counter: Counter) -> i64 {
    let status = node.status.as_ref();
    let quantities = match counter {
        Counter::Capacity => status.and_then(|status| status.capacity.as_ref()),
        Counter::Allocatable => status.and_then(|status| status.allocatable.as_ref()),
    };
    quantities
        .and_then(|quantities| quantities.get(resource_name))
        .map_or(0, quantity_value)
}

/// Extended resources are whole device counts, so a plain integer parse is
/// enough; anything else counts as zero.
fn quantity_value(quantity: &Quantity) -> i64 {
    quantity.0.parse().unwrap_or(0)
}

fn is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|condition| condition.type_ == "Ready" && condition.status == "True")
        })
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{NodeCondition, NodeStatus};
    use std::collections::BTreeMap;

    use super::*;

    fn node(ready: bool, capacity: i64, allocatable: i64) -> Node {
        let resources = |count: i64| {
            let mut map = BTreeMap::new();
            map.insert("nvidia.com/gpu".to_string(), Quantity(count.to_string()));
            map
        };
        Node {
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: if ready { "True" } else { "False" }.to_string(),
                    ..NodeCondition::default()
                }]),
                capacity: Some(resources(capacity)),
                allocatable: Some(resources(allocatable)),
                ..NodeStatus::default()
            }),
            ..Node::default()
        }
    }

    #[test]
    fn counts_only_ready_nodes() {
        let ready = node(true, 4, 2);
        let not_ready = node(false, 8, 8);
        assert!(is_ready(&ready));
        assert!(!is_ready(&not_ready));
        assert_eq!(resource_count(&ready, "nvidia.com/gpu", Counter::Capacity), 4);
        assert_eq!(
            resource_count(&ready, "nvidia.com/gpu", Counter::Allocatable),
            2
        );
    }

    #[test]
    fn missing_resource_counts_as_zero() {
        let bare = Node::default();
        assert_eq!(resource_count(&bare, "nvidia.com/gpu", Counter::Capacity), 0);
        assert!(!is_ready(&bare));
    }

    #[test]
    fn fractional_quantities_count_as_zero() {
        assert_eq!(quantity_value(&Quantity("4".to_string())), 4);
        assert_eq!(quantity_value(&Quantity("100m".to_string())), 0);
        assert_eq!(quantity_value(&Quantity(String::new())), 0);
    }
}
