//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Sync invocation:
//!     → retries.rs (attempt loop, classification, outcome accounting)
//!     → backoff.rs (delay before each retry)
//! Per-attempt timeouts live in the upstream client; every external call
//! has a deadline.
//! ```

pub mod backoff;
pub mod retries;

pub use retries::{Invoker, SyncError};
