//! Error taxonomy for the probe layer.
//!
//! Callers distinguish three situations: the check itself failed
//! ([`ProbeError`]), the condition never became true in time
//! ([`WaitError::Timeout`]), and the timing parameters were nonsensical
//! ([`WaitSpecError`]).

use std::time::Duration;

use thiserror::Error;

use crate::metrics::MetricsError;

/// A probe could not determine whether its condition holds.
///
/// This is distinct from the condition being false: a probe that observes
/// "not yet" reports [`crate::ProbeOutcome::Pending`], not an error.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The cluster API call failed.
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// A metrics backend call failed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// The response was readable but not in the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Failure modes of [`crate::wait_for`].
#[derive(Error, Debug)]
pub enum WaitError {
    /// The condition never became true within the allotted time.
    #[error("condition not satisfied after {waited:?}")]
    Timeout {
        /// Total time spent polling before giving up.
        waited: Duration,
    },

    /// The probe itself failed; polling stopped immediately.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl WaitError {
    /// Whether this is a timeout rather than a probe failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Rejected [`crate::WaitSpec`] parameters.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WaitSpecError {
    /// A zero timeout would never allow a retry.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    /// A zero poll interval would spin.
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    /// An interval beyond the timeout would never poll again.
    #[error("poll interval {interval:?} exceeds timeout {timeout:?}")]
    IntervalExceedsTimeout {
        /// Requested poll interval.
        interval: Duration,
        /// Requested timeout.
        timeout: Duration,
    },
}
