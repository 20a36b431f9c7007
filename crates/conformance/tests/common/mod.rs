//! Shared setup for live-cluster conformance scenarios.
//!
//! Scenarios are `#[ignore]`d and additionally gated on
//! `AI_CONFORMANCE_E2E=1`, so a plain `cargo test` never touches a cluster.

#![allow(dead_code)]

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::Client;
use std::collections::BTreeMap;

use conformance::config::{TestConfig, E2E_GATE_ENV};
use conformance::namespace::{delete_namespaces, NamespaceFilters};
use conformance::client;

/// Label stamped on every namespace this suite creates.
const SCRATCH_LABEL: &str = "ai-conformance-scratch";

/// Connects to the cluster when live scenarios are enabled, else `None`.
pub async fn live_cluster() -> Option<(TestConfig, Client)> {
    if !TestConfig::e2e_enabled() {
        eprintln!("skipping: set {E2E_GATE_ENV}=1 to run live-cluster scenarios");
        return None;
    }
    let config = TestConfig::from_env();
    let cluster = client::cluster_client(&config)
        .await
        .expect("failed to build cluster client");
    Some((config, cluster))
}

/// Create a scratch namespace unique to this test process.
pub async fn scratch_namespace(client: &Client, prefix: &str) -> String {
    let name = format!("{prefix}-{}", std::process::id());
    let mut labels = BTreeMap::new();
    labels.insert(SCRATCH_LABEL.to_string(), "true".to_string());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    };
    let api: Api<Namespace> = Api::all(client.clone());
    api.create(&PostParams::default(), &namespace)
        .await
        .expect("failed to create scratch namespace");
    name
}

/// Delete every scratch namespace this suite labeled, sparing system ones.
pub async fn cleanup_scratch(client: &Client) {
    let filters = NamespaceFilters {
        delete_labels: vec![SCRATCH_LABEL.to_string()],
        skip: vec!["kube-".to_string(), "default".to_string()],
        ..NamespaceFilters::default()
    };
    if let Err(err) = delete_namespaces(client, &filters).await {
        eprintln!("scratch namespace cleanup failed: {err:#}");
    }
}
