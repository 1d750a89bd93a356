//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routes, layers)
//!     → request.rs (resolve request ID, stash in extensions)
//!     → handlers (sync via resilient invoker, health snapshot)
//!     → response.rs (reply bodies, failure mapping)
//!     → request.rs (echo request ID on the response)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
