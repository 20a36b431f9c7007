//! Read-only queries against a metrics backend.
//!
//! A query is addressed either directly (an HTTP base URL) or through the
//! cluster API server's service proxy. The response body is returned as raw
//! text; interpreting the payload is the caller's job, and retries are
//! composed with [`crate::wait_for`] rather than performed here.

use std::time::Duration;

use kube::Client;
use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

/// Query API path on the metrics backend.
const QUERY_PATH: &str = "/api/v1/query";

/// Default request timeout for direct queries.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default service port for proxied queries.
const DEFAULT_PROXY_PORT: &str = "9090";

/// Errors raised by [`MetricsClient`].
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Neither a direct URL nor a proxy target was configured. Detected
    /// before any I/O is attempted.
    #[error("metrics backend not configured: set a base URL or a proxy namespace and service")]
    NotConfigured,

    /// The direct HTTP call failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("metrics backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The proxied call through the API server failed.
    #[error("API server proxy error: {0}")]
    Proxy(#[from] kube::Error),

    /// The proxy request could not be assembled from the given inputs.
    #[error("invalid proxy request: {0}")]
    InvalidRequest(#[from] http::Error),
}

/// Raw result of a single query. Immutable once produced.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The originating query string.
    pub query: String,
    /// Response body, verbatim. Commonly a JSON envelope; never parsed here.
    pub body: String,
}

/// Optional-field addressing configuration, resolved when a client is built.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Direct base URL of the backend.
    pub base_url: Option<String>,
    /// Namespace of the in-cluster service to proxy to.
    pub proxy_namespace: Option<String>,
    /// Name of the in-cluster service to proxy to.
    pub proxy_service: Option<String>,
    /// Service port for proxied queries.
    pub proxy_port: String,
    /// Request timeout for direct queries, in seconds.
    pub timeout_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            proxy_namespace: None,
            proxy_service: None,
            proxy_port: DEFAULT_PROXY_PORT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

enum Transport {
    Direct {
        http: reqwest::Client,
        base_url: String,
    },
    Proxied {
        client: Client,
        namespace: String,
        service: String,
        port: String,
    },
}

/// Client issuing single read-only queries against a metrics backend.
pub struct MetricsClient {
    transport: Transport,
}

impl std::fmt::Debug for MetricsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self.transport {
            Transport::Direct { .. } => "Direct",
            Transport::Proxied { .. } => "Proxied",
        };
        f.debug_struct("MetricsClient")
            .field("transport", &variant)
            .finish()
    }
}

impl MetricsClient {
    /// Address the backend directly over HTTP.
    ///
    /// # Errors
    /// Returns [`MetricsError::Http`] when the HTTP client cannot be built.
    pub fn direct(base_url: impl Into<String>) -> Result<Self, MetricsError> {
        Self::direct_with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    /// Address the backend directly with an explicit request timeout.
    ///
    /// # Errors
    /// Returns [`MetricsError::Http`] when the HTTP client cannot be built.
    pub fn direct_with_timeout(
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, MetricsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            transport: Transport::Direct {
                http,
                base_url: base_url.into(),
            },
        })
    }

    /// Address an in-cluster service through the API server's proxy.
    #[must_use]
    pub fn proxied(
        client: Client,
        namespace: impl Into<String>,
        service: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            transport: Transport::Proxied {
                client,
                namespace: namespace.into(),
                service: service.into(),
                port: port.into(),
            },
        }
    }

    /// Build a client from an addressing configuration.
    ///
    /// A complete proxy target takes precedence over a direct URL; with
    /// neither configured this fails fast without touching the network.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] when no addressing mode is
    /// set, or [`MetricsError::Http`] when the HTTP client cannot be built.
    pub fn from_config(config: &MetricsConfig, client: Option<Client>) -> Result<Self, MetricsError> {
        if let (Some(namespace), Some(service), Some(client)) = (
            config.proxy_namespace.as_deref(),
            config.proxy_service.as_deref(),
            client,
        ) {
            return Ok(Self::proxied(
                client,
                namespace,
                service,
                config.proxy_port.clone(),
            ));
        }
        match config.base_url.as_deref() {
            Some(base_url) => Self::direct_with_timeout(base_url, config.timeout_secs),
            None => Err(MetricsError::NotConfigured),
        }
    }

    /// Issue one query and return the raw response body.
    ///
    /// # Errors
    /// Returns [`MetricsError`] when the call fails or the body cannot be
    /// read; a body without the data the caller hoped for is still `Ok`.
    pub async fn query(&self, query: &str) -> Result<QueryResult, MetricsError> {
        let body = match &self.transport {
            Transport::Direct { http, base_url } => {
                let url = format!("{}{QUERY_PATH}", base_url.trim_end_matches('/'));
                debug!(%url, query, "direct metrics query");
                let response = http.get(&url).query(&[("query", query)]).send().await?;
                let status = response.status();
                let body = response.text().await?;
                if !status.is_success() {
                    return Err(MetricsError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                body
            }
            Transport::Proxied {
                client,
                namespace,
                service,
                port,
            } => {
                let encoded: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("query", query)
                    .finish();
                let path = format!(
                    "/api/v1/namespaces/{namespace}/services/{service}:{port}/proxy{QUERY_PATH}?{encoded}"
                );
                debug!(%path, "proxied metrics query");
                let request = http::Request::get(path.as_str()).body(Vec::new())?;
                client.request_text(request).await?
            }
        };
        Ok(QueryResult {
            query: query.to_string(),
            body,
        })
    }
}
