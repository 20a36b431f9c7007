//! API discovery with a read-through cache.
//!
//! Discovery answers ("is `resource.k8s.io/v1` served?") are stable for the
//! lifetime of a conformance run, so they are cached per [`DiscoveryCache`]
//! and never invalidated: an API installed after the first lookup for its
//! group/version is not observed until a fresh cache is constructed.

use std::collections::HashMap;

use async_trait::async_trait;
use kube::Client;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ProbeError;

/// Backend answering whether a group/version is currently served.
///
/// A seam for tests; production code uses [`ApiServerDiscovery`].
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Whether `group_version` (e.g. `resource.k8s.io/v1`) is served with at
    /// least one resource.
    ///
    /// # Errors
    /// Returns [`ProbeError`] when the lookup itself fails; "not served" is
    /// `Ok(false)`, not an error.
    async fn group_version_served(&self, group_version: &str) -> Result<bool, ProbeError>;
}

/// Discovery backed by the cluster API server.
pub struct ApiServerDiscovery {
    client: Client,
}

impl ApiServerDiscovery {
    /// Wrap a cluster client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiscoverySource for ApiServerDiscovery {
    async fn group_version_served(&self, group_version: &str) -> Result<bool, ProbeError> {
        match self.client.list_api_group_resources(group_version).await {
            Ok(list) => Ok(!list.resources.is_empty()),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(false),
            Err(err) => Err(ProbeError::Api(err)),
        }
    }
}

/// Read-through cache of discovery answers, keyed by group/version string.
///
/// Safe for concurrent use: racing lookups may both hit the backend, but the
/// first inserted answer wins and the answers are identical, so the duplicate
/// call is the only cost. Errors are never cached.
#[derive(Default)]
pub struct DiscoveryCache {
    entries: RwLock<HashMap<String, bool>>,
}

impl DiscoveryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `group_version` is served, consulting `source` on a miss.
    ///
    /// # Errors
    /// Returns [`ProbeError`] when the backend lookup fails.
    pub async fn served(
        &self,
        source: &dyn DiscoverySource,
        group_version: &str,
    ) -> Result<bool, ProbeError> {
        if let Some(&served) = self.entries.read().await.get(group_version) {
            return Ok(served);
        }
        let served = source.group_version_served(group_version).await?;
        let mut entries = self.entries.write().await;
        let served = *entries.entry(group_version.to_string()).or_insert(served);
        debug!(group_version, served, "cached discovery answer");
        Ok(served)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Fake source counting backend lookups.
    struct CountingSource {
        served: bool,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(served: bool) -> Self {
            Self {
                served,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DiscoverySource for CountingSource {
        async fn group_version_served(&self, _group_version: &str) -> Result<bool, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.served)
        }
    }

    /// Source that always fails.
    struct FailingSource;

    #[async_trait]
    impl DiscoverySource for FailingSource {
        async fn group_version_served(&self, _group_version: &str) -> Result<bool, ProbeError> {
            Err(ProbeError::Malformed("discovery unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let source = CountingSource::new(true);
        let cache = DiscoveryCache::new();

        assert!(cache.served(&source, "resource.k8s.io/v1").await.unwrap());
        assert!(cache.served(&source, "resource.k8s.io/v1").await.unwrap());

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn negative_answers_are_cached_too() {
        let source = CountingSource::new(false);
        let cache = DiscoveryCache::new();

        assert!(!cache.served(&source, "kueue.x-k8s.io/v1beta1").await.unwrap());
        assert!(!cache.served(&source, "kueue.x-k8s.io/v1beta1").await.unwrap());

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_group_versions_are_cached_independently() {
        let source = CountingSource::new(true);
        let cache = DiscoveryCache::new();

        cache.served(&source, "monitoring.coreos.com/v1").await.unwrap();
        cache.served(&source, "karpenter.sh/v1").await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = DiscoveryCache::new();

        assert!(cache.served(&FailingSource, "gateway.networking.k8s.io/v1").await.is_err());

        // A later lookup with a healthy source still reaches the backend.
        let source = CountingSource::new(true);
        assert!(cache.served(&source, "gateway.networking.k8s.io/v1").await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_lookups_agree() {
        let source = Arc::new(CountingSource::new(true));
        let cache = Arc::new(DiscoveryCache::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let source = Arc::clone(&source);
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.served(source.as_ref(), "resource.k8s.io/v1").await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }
}
