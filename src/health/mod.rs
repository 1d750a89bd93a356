//! Health subsystem.
//!
//! # Data Flow
//! ```text
//! active.rs: periodic probe → DependencyHealth (state.rs)
//! upstream client: per-attempt outcomes → DependencyHealth (passive feed)
//! /health handler: HealthRegistry snapshot → UP/DOWN response
//! ```
//!
//! Health failures are reported, never fatal: the process keeps serving
//! /health as DOWN.

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{DependencyHealth, HealthRegistry};
