//! Response bodies and error mapping.
//!
//! Both fatal and exhausted sync failures surface to callers as one 503;
//! the internal distinction exists only for logs and metrics.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::resilience::retries::SyncError;

pub const SYNC_COMPLETED: &str = "Event synchronization completed";
pub const SYNC_FAILED: &str = "Event sync failed after retries";
pub const SYNC_CANCELLED: &str = "Event sync cancelled";

/// Body of a successful sync response.
#[derive(Debug, Serialize)]
pub struct SyncReply {
    pub message: &'static str,
}

/// Body of a failed sync response.
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub error: &'static str,
}

/// Body of the health endpoint when all dependencies are reachable.
#[derive(Debug, Serialize)]
pub struct HealthUp {
    pub status: &'static str,
    pub services: Vec<String>,
}

impl HealthUp {
    pub fn new(services: Vec<String>) -> Self {
        Self {
            status: "UP",
            services,
        }
    }
}

/// Body of the health endpoint when a dependency is unreachable.
#[derive(Debug, Serialize)]
pub struct HealthDown {
    pub status: &'static str,
    pub error: String,
}

impl HealthDown {
    pub fn new(error: String) -> Self {
        Self {
            status: "DOWN",
            error,
        }
    }
}

/// Map a terminal sync failure onto its HTTP reply.
pub fn sync_failure(error: &SyncError) -> (StatusCode, Json<ErrorReply>) {
    let body = match error {
        SyncError::Cancelled => ErrorReply {
            error: SYNC_CANCELLED,
        },
        SyncError::Fatal(_) | SyncError::Exhausted { .. } => ErrorReply { error: SYNC_FAILED },
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body))
}
