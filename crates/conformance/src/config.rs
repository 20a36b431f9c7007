//! Environment-driven harness configuration.

use std::path::PathBuf;
use std::time::Duration;

use probe::{MetricsConfig, WaitSpec};

/// Env var gating live-cluster scenarios. Set to `1` to run them.
pub const E2E_GATE_ENV: &str = "AI_CONFORMANCE_E2E";

/// Extended resource name advertised by the NVIDIA device plugin.
pub const DEFAULT_GPU_RESOURCE: &str = "nvidia.com/gpu";

/// Harness configuration, read once per scenario from the environment.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Explicit kubeconfig path; `None` falls through to in-cluster or
    /// default client inference.
    pub kubeconfig: Option<PathBuf>,
    /// Extended resource name counted as an accelerator.
    pub gpu_resource_name: String,
    /// Metrics backend addressing.
    pub metrics: MetricsConfig,
}

impl TestConfig {
    /// Load configuration from the environment.
    ///
    /// `KUBECONFIG` wins; otherwise `$HOME/.kube/config` is used when it
    /// exists, matching the suite's historical behavior.
    #[must_use]
    pub fn from_env() -> Self {
        let kubeconfig = std::env::var_os("KUBECONFIG")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .map(|home| PathBuf::from(home).join(".kube").join("config"))
                    .filter(|path| path.exists())
            });

        let mut metrics = MetricsConfig {
            base_url: std::env::var("PROMETHEUS_URL").ok(),
            proxy_namespace: std::env::var("PROMETHEUS_NAMESPACE").ok(),
            proxy_service: std::env::var("PROMETHEUS_SERVICE").ok(),
            ..MetricsConfig::default()
        };
        if let Ok(port) = std::env::var("PROMETHEUS_PORT") {
            metrics.proxy_port = port;
        }

        Self {
            kubeconfig,
            gpu_resource_name: std::env::var("GPU_RESOURCE_NAME")
                .unwrap_or_else(|_| DEFAULT_GPU_RESOURCE.to_string()),
            metrics,
        }
    }

    /// Whether live-cluster scenarios were explicitly enabled.
    #[must_use]
    pub fn e2e_enabled() -> bool {
        std::env::var(E2E_GATE_ENV).as_deref() == Ok("1")
    }

    /// Polling preset for conditions that settle quickly, such as CRD
    /// establishment.
    ///
    /// # Panics
    /// Never; the constants are valid.
    #[must_use]
    pub fn fast_wait() -> WaitSpec {
        WaitSpec::new(Duration::from_secs(120), Duration::from_secs(2))
            .expect("fast wait preset is valid")
    }

    /// Polling preset for slow cluster convergence: metrics collection,
    /// node provisioning and reclamation.
    ///
    /// # Panics
    /// Never; the constants are valid.
    #[must_use]
    pub fn slow_wait() -> WaitSpec {
        WaitSpec::new(Duration::from_secs(15 * 60), Duration::from_secs(15))
            .expect("slow wait preset is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_presets_are_valid() {
        assert_eq!(TestConfig::fast_wait().poll_interval(), Duration::from_secs(2));
        assert_eq!(TestConfig::slow_wait().timeout(), Duration::from_secs(900));
    }
}
