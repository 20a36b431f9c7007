//! Condition-polling probes for cluster conformance testing.
//!
//! Three pieces compose into every "wait until the cluster looks right"
//! assertion:
//!
//! - [`ResourceProbe`] answers a point-in-time question about cluster state
//!   (is an API group/version served, does an object carry a status
//!   condition, does an object still exist).
//! - [`wait_for`] polls any probe function under a [`WaitSpec`] budget,
//!   keeping "condition never became true" ([`WaitError::Timeout`]) distinct
//!   from "checking the condition failed" ([`WaitError::Probe`]).
//! - [`MetricsClient`] issues a single read-only query against a metrics
//!   backend, directly or through the API server's service proxy, returning
//!   the raw body for the caller to interpret.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use probe::{wait_for, ResourceProbe, ResourceRef, WaitSpec};
//!
//! let probe = ResourceProbe::new(client);
//! let crd = ResourceRef::cluster_scoped(
//!     "apiextensions.k8s.io",
//!     "v1",
//!     "CustomResourceDefinition",
//!     "customresourcedefinitions",
//!     "httproutes.gateway.networking.k8s.io",
//! );
//! let spec = WaitSpec::new(Duration::from_secs(120), Duration::from_secs(2))?;
//! let crd = &crd;
//! let probe = &probe;
//! wait_for(&spec, move || async move {
//!     probe.object_condition(crd, "Established", "True").await
//! })
//! .await?;
//! ```
//!
//! Probes are side-effect-free from the caller's perspective; mutations
//! (creating workloads, installing charts) belong to the harness layer built
//! on top.

pub mod discovery;
pub mod error;
pub mod metrics;
pub mod resource;
pub mod wait;

pub use discovery::{ApiServerDiscovery, DiscoveryCache, DiscoverySource};
pub use error::{ProbeError, WaitError, WaitSpecError};
pub use metrics::{MetricsClient, MetricsConfig, MetricsError, QueryResult};
pub use resource::{ResourceProbe, ResourceRef};
pub use wait::{wait_for, ProbeOutcome, WaitSpec};
