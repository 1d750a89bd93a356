//! Downstream dependency subsystem.
//!
//! # Data Flow
//! ```text
//! sync handler
//!     → resilience::retries (attempt loop)
//!     → client.rs (one POST per attempt, per-attempt timeout)
//!     → types.rs (failure classified retryable/fatal)
//!     → health state fed passively from attempt outcomes
//! ```

pub mod client;
pub mod types;

pub use client::SyncClient;
pub use types::{ErrorKind, UpstreamError};
