//! Gateway API support scenarios.

mod common;

use conformance::crd::{self, GATEWAY_CRDS};
use conformance::TestConfig;
use probe::ResourceProbe;

#[tokio::test]
#[ignore = "requires a live cluster; enable with AI_CONFORMANCE_E2E=1"]
async fn gateway_crds_are_established() {
    let Some((_config, client)) = common::live_cluster().await else {
        return;
    };
    let probe = ResourceProbe::new(client);

    let mut missing = Vec::new();
    for name in GATEWAY_CRDS {
        let exists = probe
            .object_exists(&crd::crd_ref(name))
            .await
            .expect("failed to read CRD");
        if !exists.is_satisfied() {
            missing.push(name);
        }
    }
    assert!(missing.is_empty(), "missing gateway crds: {missing:?}");

    let spec = TestConfig::fast_wait();
    for name in GATEWAY_CRDS {
        crd::wait_for_crd_established(&probe, &spec, name)
            .await
            .unwrap_or_else(|err| panic!("{name} never became ready: {err}"));
    }
}
