//! Metrics collection and exposition.
//!
//! # Metrics
//! - `event_sync_total` (counter): completed sync invocations by `status`
//! - `sync_endpoint_calls_total` (counter): calls to the sync endpoint
//! - `gateway_http_requests_total` (counter): responses by endpoint, status
//! - `gateway_http_request_duration_seconds` (histogram): latency
//! - `gateway_dependency_up` (gauge): 1=reachable, 0=unreachable
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Outcome accounting goes through a single entry point so each
//!   completed invocation increments exactly one label exactly once

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const EVENT_SYNC_TOTAL: &str = "event_sync_total";
pub const SYNC_ENDPOINT_CALLS: &str = "sync_endpoint_calls_total";
pub const HTTP_REQUESTS_TOTAL: &str = "gateway_http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "gateway_http_request_duration_seconds";
pub const DEPENDENCY_UP: &str = "gateway_dependency_up";

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            describe_counter!(
                EVENT_SYNC_TOTAL,
                "Total number of event synchronizations by outcome"
            );
            describe_counter!(SYNC_ENDPOINT_CALLS, "Number of event sync calls");
            describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP responses by endpoint and status");
            describe_histogram!(HTTP_REQUEST_DURATION, "HTTP request latency in seconds");
            describe_gauge!(DEPENDENCY_UP, "Dependency reachability (1=up, 0=down)");
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record one handled HTTP request.
pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!(HTTP_REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    histogram!(HTTP_REQUEST_DURATION, "endpoint" => endpoint).record(start.elapsed().as_secs_f64());
}

/// Count one call to the sync endpoint, before its outcome is known.
pub fn record_sync_call() {
    counter!(SYNC_ENDPOINT_CALLS).increment(1);
}

/// Record a dependency health sweep.
pub fn record_dependency_health(name: &str, up: bool) {
    gauge!(DEPENDENCY_UP, "dependency" => name.to_string()).set(if up { 1.0 } else { 0.0 });
}

/// Terminal outcome of one sync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Failure,
}

impl SyncOutcome {
    pub fn as_label(self) -> &'static str {
        match self {
            SyncOutcome::Success => "success",
            SyncOutcome::Failure => "failure",
        }
    }
}

/// Process-wide outcome accounting.
///
/// The atomic pair is the source of truth for tests and introspection;
/// `record` also bumps the exported `event_sync_total` counter. Cancelled
/// invocations never reach this type.
#[derive(Debug, Default)]
pub struct OutcomeCounter {
    success: AtomicU64,
    failure: AtomicU64,
}

impl OutcomeCounter {
    /// Record the terminal outcome of one completed invocation.
    pub fn record(&self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Success => self.success.fetch_add(1, Ordering::Relaxed),
            SyncOutcome::Failure => self.failure.fetch_add(1, Ordering::Relaxed),
        };
        counter!(EVENT_SYNC_TOTAL, "status" => outcome.as_label()).increment(1);
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn failure(&self) -> u64 {
        self.failure.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_increments_exactly_one_label() {
        let counter = OutcomeCounter::default();
        counter.record(SyncOutcome::Success);
        assert_eq!(counter.success(), 1);
        assert_eq!(counter.failure(), 0);

        counter.record(SyncOutcome::Failure);
        counter.record(SyncOutcome::Failure);
        assert_eq!(counter.success(), 1);
        assert_eq!(counter.failure(), 2);
    }

    #[test]
    fn labels_match_exposed_names() {
        assert_eq!(SyncOutcome::Success.as_label(), "success");
        assert_eq!(SyncOutcome::Failure.as_label(), "failure");
    }
}
