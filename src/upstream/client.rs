//! Downstream sync client.
//!
//! # Responsibilities
//! - Forward event payloads to the configured upstream endpoint
//! - Enforce a per-attempt timeout on every call
//! - Propagate the correlation ID to the upstream
//! - Feed attempt outcomes into the dependency health state

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{header, HeaderValue, Method, Request, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tokio::time::timeout;

use crate::config::{HealthCheckConfig, UpstreamConfig};
use crate::health::state::DependencyHealth;
use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::upstream::types::UpstreamError;

/// HTTP client for the downstream sync dependency.
pub struct SyncClient {
    client: Client<HttpConnector, Body>,
    endpoint: Uri,
    probe_uri: Uri,
    attempt_timeout: Duration,
    probe_timeout: Duration,
    dependency: Arc<DependencyHealth>,
    healthy_threshold: u32,
    unhealthy_threshold: u32,
}

impl SyncClient {
    pub fn new(
        upstream: &UpstreamConfig,
        health: &HealthCheckConfig,
        dependency: Arc<DependencyHealth>,
    ) -> Result<Self, UpstreamError> {
        let endpoint: Uri = upstream
            .endpoint
            .parse()
            .map_err(|e| UpstreamError::Endpoint(format!("'{}': {}", upstream.endpoint, e)))?;

        let probe_uri = probe_uri(&endpoint, &health.path)?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            endpoint,
            probe_uri,
            attempt_timeout: Duration::from_secs(upstream.request_timeout_secs),
            probe_timeout: Duration::from_secs(health.timeout_secs),
            dependency,
            healthy_threshold: health.healthy_threshold,
            unhealthy_threshold: health.unhealthy_threshold,
        })
    }

    /// Health state fed by this client.
    pub fn dependency(&self) -> &Arc<DependencyHealth> {
        &self.dependency
    }

    /// Execute one sync attempt against the upstream.
    pub async fn sync_event(
        &self,
        request_id: &RequestId,
        payload: &Value,
    ) -> Result<(), UpstreamError> {
        let body = serde_json::to_vec(payload)?;

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json");
        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            builder = builder.header(X_REQUEST_ID, value);
        }
        let request = builder.body(Body::from(body))?;

        match timeout(self.attempt_timeout, self.client.request(request)).await {
            Err(_) => {
                self.dependency.mark_failure(self.unhealthy_threshold);
                Err(UpstreamError::Timeout(self.attempt_timeout))
            }
            Ok(Err(e)) => {
                self.dependency.mark_failure(self.unhealthy_threshold);
                Err(UpstreamError::Connect(e.to_string()))
            }
            Ok(Ok(response)) => match UpstreamError::from_status(response.status()) {
                None => {
                    self.dependency.mark_success(self.healthy_threshold);
                    Ok(())
                }
                Some(err @ UpstreamError::Unavailable(_)) => {
                    self.dependency.mark_failure(self.unhealthy_threshold);
                    Err(err)
                }
                // The upstream answered, so it is reachable even though it
                // refused the request.
                Some(err) => {
                    self.dependency.mark_success(self.healthy_threshold);
                    Err(err)
                }
            },
        }
    }

    /// Probe the upstream's health path. Returns true on a 2xx answer
    /// within the probe timeout.
    pub async fn probe(&self) -> bool {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.probe_uri.clone())
            .header(header::USER_AGENT, "sync-gateway-health-check")
            .body(Body::empty());

        let request = match request {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build health probe request");
                return false;
            }
        };

        match timeout(self.probe_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let healthy = response.status().is_success();
                if !healthy {
                    tracing::warn!(
                        dependency = %self.dependency.name(),
                        status = %response.status(),
                        "Health probe failed: non-success status"
                    );
                }
                healthy
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    dependency = %self.dependency.name(),
                    error = %e,
                    "Health probe failed: connection error"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    dependency = %self.dependency.name(),
                    "Health probe failed: timeout"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("endpoint", &self.endpoint)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("dependency", &self.dependency.name())
            .finish()
    }
}

/// Build the probe URI from the endpoint's scheme/authority and the
/// configured health path.
fn probe_uri(endpoint: &Uri, path: &str) -> Result<Uri, UpstreamError> {
    let path_and_query: PathAndQuery = path
        .parse()
        .map_err(|e| UpstreamError::Endpoint(format!("health path '{}': {}", path, e)))?;

    let mut parts = endpoint.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).map_err(|e| UpstreamError::Endpoint(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_uri_replaces_path() {
        let endpoint: Uri = "http://127.0.0.1:9000/events".parse().unwrap();
        let probe = probe_uri(&endpoint, "/health").unwrap();
        assert_eq!(probe.to_string(), "http://127.0.0.1:9000/health");
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let upstream = UpstreamConfig {
            endpoint: "http://bad host/events".into(),
            ..UpstreamConfig::default()
        };
        let dep = Arc::new(DependencyHealth::new("event-store"));
        let result = SyncClient::new(&upstream, &HealthCheckConfig::default(), dep);
        assert!(matches!(result, Err(UpstreamError::Endpoint(_))));
    }
}
