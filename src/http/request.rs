//! Request correlation.
//!
//! # Responsibilities
//! - Resolve a unique request ID per inbound request (reuse or generate)
//! - Make the ID available to handlers via request extensions
//! - Echo the ID back on the response so callers can stitch traces
//!
//! # Design Decisions
//! - Caller-supplied `X-Request-ID` values are reused verbatim
//! - Resolution never fails; a missing ID degrades to a sentinel
//! - The ID is passed explicitly down the call path, never looked up
//!   from ambient state

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderValue, Request, Response};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the correlation identifier, inbound and outbound.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Sentinel used when no request scope is active.
const SENTINEL: &str = "unknown";

/// Correlation identifier for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Resolve the ID for a request: reuse a non-empty caller-supplied
    /// header value, otherwise generate a fresh token.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::generate)
    }

    /// Generate a fresh globally-unique ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Sentinel ID for log lines emitted outside any request scope.
    pub fn sentinel() -> Self {
        Self(SENTINEL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header value form. `None` only if the ID contains bytes that are
    /// invalid in a header, which cannot happen for reused header values
    /// or generated tokens.
    fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extension trait for reading the resolved ID off a request.
pub trait RequestIdExt {
    /// The ID resolved by [`RequestIdLayer`], if the layer ran.
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Middleware layer that resolves and echoes the request ID.
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service wrapper applied by [`RequestIdLayer`].
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let id = RequestId::from_headers(req.headers());
        if let Some(value) = id.header_value() {
            req.headers_mut().insert(X_REQUEST_ID, value);
        }
        req.extensions_mut().insert(id.clone());

        // Use the service that was polled ready; keep the clone for later calls.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut res = inner.call(req).await?;
            if let Some(value) = id.header_value() {
                res.headers_mut().insert(X_REQUEST_ID, value);
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_caller_supplied_id() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));

        let id = RequestId::from_headers(&headers);
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn generates_when_header_missing() {
        let id = RequestId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn generates_when_header_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static(""));

        let id = RequestId::from_headers(&headers);
        assert!(!id.as_str().is_empty());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn sentinel_is_stable() {
        assert_eq!(RequestId::sentinel().as_str(), "unknown");
    }

    #[test]
    fn ext_reads_id_from_extensions() {
        let mut req = Request::builder().body(()).unwrap();
        assert!(req.request_id().is_none());

        req.extensions_mut().insert(RequestId::generate());
        assert!(req.request_id().is_some());
    }
}
