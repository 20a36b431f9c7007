//! AI conformance harness for Kubernetes clusters.
//!
//! Builds on the `probe` crate to express the conformance scenarios: cluster
//! client construction, scenario gating, accelerator inventory, Helm
//! execution, Prometheus operator objects, and namespace cleanup. The
//! scenarios themselves live under `tests/` and run against a live cluster
//! when `AI_CONFORMANCE_E2E=1`.

pub mod client;
pub mod config;
pub mod crd;
pub mod gpu;
pub mod helm;
pub mod monitor;
pub mod namespace;
pub mod skip;

pub use config::TestConfig;
pub use skip::Gate;
