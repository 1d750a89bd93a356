//! Sync invocation retry loop.
//!
//! # State machine (per invocation)
//! ```text
//! ATTEMPTING --(call succeeds)-------------------------------> SUCCESS
//! ATTEMPTING --(retryable failure, attempts < max)-----------> RETRYING
//! RETRYING   --(after backoff delay)-------------------------> ATTEMPTING
//! ATTEMPTING --(fatal failure)-------------------------------> FAILED_FATAL
//! ATTEMPTING --(retryable failure, attempts == max)----------> FAILED_EXHAUSTED
//! ```
//!
//! # Design Decisions
//! - Classification is an injectable predicate; connection failures,
//!   timeouts and upstream 5xx are retryable, everything else fatal
//! - The outcome counter is bumped exactly once per invocation, on the
//!   terminal transition, never per attempt
//! - A cancelled invocation records no outcome at all

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::http::request::RequestId;
use crate::observability::metrics::{OutcomeCounter, SyncOutcome};
use crate::resilience::backoff::calculate_backoff;
use crate::upstream::types::{ErrorKind, UpstreamError};

/// Terminal failure of one sync invocation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("sync aborted by non-retryable error: {0}")]
    Fatal(#[source] UpstreamError),

    #[error("retry budget exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: UpstreamError,
    },

    #[error("sync cancelled before completion")]
    Cancelled,
}

/// Predicate deciding whether a failed attempt may consume a retry.
pub type Classifier = fn(&UpstreamError) -> ErrorKind;

fn default_classifier(error: &UpstreamError) -> ErrorKind {
    error.kind()
}

/// Drives one downstream operation through the bounded retry policy.
pub struct Invoker {
    policy: RetryConfig,
    classify: Classifier,
    outcomes: Arc<OutcomeCounter>,
}

impl Invoker {
    pub fn new(policy: RetryConfig, outcomes: Arc<OutcomeCounter>) -> Self {
        Self {
            policy,
            classify: default_classifier,
            outcomes,
        }
    }

    /// Replace the error classifier.
    pub fn with_classifier(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    /// Execute `operation` until it succeeds, fails fatally, or the retry
    /// budget is spent. `cancel` aborts the loop between attempts; a
    /// cancelled invocation returns [`SyncError::Cancelled`] without
    /// touching the outcome counter.
    pub async fn invoke<T, F, Fut>(
        &self,
        request_id: &RequestId,
        mut operation: F,
        cancel: &mut broadcast::Receiver<()>,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => {
                    tracing::info!(
                        request_id = %request_id,
                        attempt,
                        "Event synchronization attempt succeeded"
                    );
                    self.outcomes.record(SyncOutcome::Success);
                    return Ok(value);
                }
                Err(error) => match (self.classify)(&error) {
                    ErrorKind::Fatal => {
                        tracing::warn!(
                            request_id = %request_id,
                            attempt,
                            error = %error,
                            "Sync failed with non-retryable error"
                        );
                        self.outcomes.record(SyncOutcome::Failure);
                        return Err(SyncError::Fatal(error));
                    }
                    ErrorKind::Retryable if attempt >= max_attempts => {
                        tracing::warn!(
                            request_id = %request_id,
                            attempt,
                            error = %error,
                            "Sync retry budget exhausted"
                        );
                        self.outcomes.record(SyncOutcome::Failure);
                        return Err(SyncError::Exhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }
                    ErrorKind::Retryable => {
                        let delay = calculate_backoff(
                            attempt,
                            self.policy.base_delay_ms,
                            self.policy.max_delay_ms,
                            self.policy.backoff_multiplier,
                        );
                        tracing::warn!(
                            request_id = %request_id,
                            attempt,
                            delay = ?delay,
                            error = %error,
                            "Sync attempt failed, retrying with backoff"
                        );
                        tokio::select! {
                            biased;
                            _ = cancel.recv() => {
                                tracing::info!(
                                    request_id = %request_id,
                                    attempt,
                                    "Sync cancelled during backoff"
                                );
                                return Err(SyncError::Cancelled);
                            }
                            _ = sleep(delay) => {}
                        }
                        attempt += 1;
                    }
                },
            }
        }
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::http::StatusCode;

    fn test_invoker(max_attempts: u32) -> (Invoker, Arc<OutcomeCounter>) {
        let policy = RetryConfig {
            max_attempts,
            base_delay_ms: 50,
            max_delay_ms: 400,
            backoff_multiplier: 2.0,
        };
        let outcomes = Arc::new(OutcomeCounter::default());
        (Invoker::new(policy, outcomes.clone()), outcomes)
    }

    fn unavailable() -> UpstreamError {
        UpstreamError::Unavailable(StatusCode::SERVICE_UNAVAILABLE)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let (invoker, outcomes) = test_invoker(5);
        let (_tx, mut cancel) = broadcast::channel(1);
        let calls = AtomicU32::new(0);

        let result = invoker
            .invoke(
                &RequestId::generate(),
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n < 3 {
                            Err(unavailable())
                        } else {
                            Ok(())
                        }
                    }
                },
                &mut cancel,
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcomes.success(), 1);
        assert_eq!(outcomes.failure(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let (invoker, outcomes) = test_invoker(5);
        let (_tx, mut cancel) = broadcast::channel(1);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = invoker
            .invoke(
                &RequestId::generate(),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(unavailable()) }
                },
                &mut cancel,
            )
            .await;

        match result {
            Err(SyncError::Exhausted { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("expected Exhausted, got {:?}", other.err()),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(outcomes.success(), 0);
        assert_eq!(outcomes.failure(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_short_circuits() {
        let (invoker, outcomes) = test_invoker(5);
        let (_tx, mut cancel) = broadcast::channel(1);
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = invoker
            .invoke(
                &RequestId::generate(),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(UpstreamError::Rejected(StatusCode::BAD_REQUEST)) }
                },
                &mut cancel,
            )
            .await;

        assert!(matches!(result, Err(SyncError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), std::time::Duration::ZERO);
        assert_eq!(outcomes.failure(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_records_no_outcome() {
        let (invoker, outcomes) = test_invoker(5);
        let (tx, mut cancel) = broadcast::channel(1);
        tx.send(()).unwrap();

        let result: Result<(), _> = invoker
            .invoke(
                &RequestId::generate(),
                || async { Err(unavailable()) },
                &mut cancel,
            )
            .await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert_eq!(outcomes.success(), 0);
        assert_eq!(outcomes.failure(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn injected_classifier_overrides_default() {
        let (invoker, outcomes) = test_invoker(5);
        let invoker = invoker.with_classifier(|_| ErrorKind::Fatal);
        let (_tx, mut cancel) = broadcast::channel(1);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = invoker
            .invoke(
                &RequestId::generate(),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(unavailable()) }
                },
                &mut cancel,
            )
            .await;

        assert!(matches!(result, Err(SyncError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.failure(), 1);
    }
}
