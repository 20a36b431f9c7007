//! Bounded condition polling.
//!
//! [`wait_for`] repeatedly evaluates a caller-supplied probe until it is
//! satisfied, it fails, or the deadline passes. The probe runs once
//! immediately, so a condition that already holds costs a single call.
//! Deadlines use [`tokio::time::Instant`], which tracks the paused test
//! clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{ProbeError, WaitError, WaitSpecError};

/// Outcome of a single probe invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The condition holds.
    Satisfied,
    /// The condition does not hold yet; polling may continue.
    Pending,
}

impl ProbeOutcome {
    /// Whether the condition holds.
    #[must_use]
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Timing parameters for [`wait_for`].
///
/// Immutable once constructed; [`WaitSpec::new`] rejects zero durations and
/// intervals longer than the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec {
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitSpec {
    /// Create a wait spec.
    ///
    /// # Errors
    /// Returns [`WaitSpecError`] when either duration is zero or the poll
    /// interval exceeds the timeout.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self, WaitSpecError> {
        if timeout.is_zero() {
            return Err(WaitSpecError::ZeroTimeout);
        }
        if poll_interval.is_zero() {
            return Err(WaitSpecError::ZeroInterval);
        }
        if poll_interval > timeout {
            return Err(WaitSpecError::IntervalExceedsTimeout {
                interval: poll_interval,
                timeout,
            });
        }
        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    /// Total time budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between probe invocations.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Poll `probe` until it reports [`ProbeOutcome::Satisfied`].
///
/// A probe error aborts polling immediately and is surfaced as
/// [`WaitError::Probe`]; exhausting the budget while the probe keeps
/// reporting [`ProbeOutcome::Pending`] yields [`WaitError::Timeout`], so
/// callers can tell "still false" from "couldn't check".
///
/// # Errors
/// Returns [`WaitError::Probe`] on the first probe failure or
/// [`WaitError::Timeout`] once `spec.timeout()` has elapsed.
pub async fn wait_for<F, Fut>(spec: &WaitSpec, mut probe: F) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match probe().await? {
            ProbeOutcome::Satisfied => {
                debug!(
                    attempts,
                    elapsed_secs = start.elapsed().as_secs(),
                    "condition satisfied"
                );
                return Ok(());
            }
            ProbeOutcome::Pending => {
                let waited = start.elapsed();
                if waited >= spec.timeout() {
                    return Err(WaitError::Timeout { waited });
                }
                debug!(attempts, waited_secs = waited.as_secs(), "condition pending");
                sleep(spec.poll_interval()).await;
            }
        }
    }
}
