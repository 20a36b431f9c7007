//! Operator robustness scenarios.
//!
//! The operator under test is named through the environment: its chart is
//! rendered with `helm template` and the CRDs it ships must become ready on
//! the cluster where it is installed.

mod common;

use conformance::{crd, helm, TestConfig};
use probe::ResourceProbe;
use serde::Deserialize;
use serde_yaml::Value;

/// Chart of the operator under test, e.g. `oci://registry.k8s.io/kueue/charts/kueue`.
const CHART_ENV: &str = "AI_OPERATOR_CHART";
/// Optional chart repository URL.
const REPO_ENV: &str = "AI_OPERATOR_REPO";
/// Namespace the operator is installed in; defaults to `default`.
const NAMESPACE_ENV: &str = "AI_OPERATOR_NAMESPACE";

/// Names of every CustomResourceDefinition in a multi-document manifest
/// stream.
fn rendered_crd_names(manifests: &str) -> Vec<String> {
    let mut names = Vec::new();
    for document in serde_yaml::Deserializer::from_str(manifests) {
        let Ok(value) = Value::deserialize(document) else {
            continue;
        };
        if value.get("kind").and_then(Value::as_str) != Some("CustomResourceDefinition") {
            continue;
        }
        if let Some(name) = value
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
        {
            names.push(name.to_string());
        }
    }
    names
}

#[tokio::test]
#[ignore = "requires a live cluster and AI_OPERATOR_CHART; enable with AI_CONFORMANCE_E2E=1"]
async fn operator_crds_become_ready() {
    let Some((_config, client)) = common::live_cluster().await else {
        return;
    };
    let Ok(chart) = std::env::var(CHART_ENV) else {
        eprintln!("skipping: set {CHART_ENV} to the installed operator's chart");
        return;
    };
    let repo = std::env::var(REPO_ENV).ok();
    let namespace = std::env::var(NAMESPACE_ENV).unwrap_or_else(|_| "default".to_string());

    let manifests = helm::template(&namespace, "conformance-operator", &chart, repo.as_deref())
        .await
        .expect("helm template failed");
    let names = rendered_crd_names(&manifests);
    assert!(!names.is_empty(), "chart {chart} renders no CRDs");

    let probe = ResourceProbe::new(client);
    let spec = TestConfig::fast_wait();
    for name in &names {
        crd::wait_for_crd_established(&probe, &spec, name)
            .await
            .unwrap_or_else(|err| panic!("CRD {name} never became ready: {err}"));
    }
}

#[test]
fn rendered_crd_names_picks_crds_out_of_a_stream() {
    let manifests = r"
apiVersion: v1
kind: ServiceAccount
metadata:
  name: operator
---
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: workloads.kueue.x-k8s.io
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: operator
---
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: clusterqueues.kueue.x-k8s.io
";
    assert_eq!(
        rendered_crd_names(manifests),
        vec![
            "workloads.kueue.x-k8s.io".to_string(),
            "clusterqueues.kueue.x-k8s.io".to_string(),
        ]
    );
}

#[test]
fn rendered_crd_names_survives_unparseable_documents() {
    let manifests = "not: [valid\n---\nkind: CustomResourceDefinition\nmetadata:\n  name: a.b.c\n";
    assert_eq!(rendered_crd_names(manifests), vec!["a.b.c".to_string()]);
}
