//! Dependency health state machine.
//!
//! # States
//! - Up: dependency considered reachable
//! - Down: dependency considered unreachable
//!
//! # State Transitions
//! ```text
//! Up → Down: consecutive failures >= unhealthy_threshold
//! Down → Up: consecutive successes >= healthy_threshold
//! ```
//!
//! Hysteresis prevents flapping; counters reset on state transition.
//! An untested dependency (Unknown) counts as reachable.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

/// Reachability state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachState {
    Unknown = 0,
    Up = 1,
    Down = 2,
}

impl From<u8> for ReachState {
    fn from(val: u8) -> Self {
        match val {
            1 => ReachState::Up,
            2 => ReachState::Down,
            _ => ReachState::Unknown,
        }
    }
}

/// Tracked reachability of one declared dependency.
#[derive(Debug)]
pub struct DependencyHealth {
    name: String,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
}

impl DependencyHealth {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: AtomicU8::new(ReachState::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ReachState {
        self.state.load(Ordering::Relaxed).into()
    }

    /// True unless the dependency has been marked Down.
    pub fn is_up(&self) -> bool {
        self.state.load(Ordering::Relaxed) != ReachState::Down as u8
    }

    /// Report a successful probe or call.
    pub fn mark_success(&self, healthy_threshold: u32) {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state.load(Ordering::Relaxed) == ReachState::Up as u8 {
            return;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.state.store(ReachState::Up as u8, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            tracing::info!(dependency = %self.name, "Dependency reachable");
        }
    }

    /// Report a failed probe or call.
    pub fn mark_failure(&self, unhealthy_threshold: u32) {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.state.load(Ordering::Relaxed) == ReachState::Down as u8 {
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.state.store(ReachState::Down as u8, Ordering::Relaxed);
            self.consecutive_failures.store(0, Ordering::Relaxed);
            tracing::warn!(dependency = %self.name, "Dependency unreachable");
        }
    }
}

/// The set of dependencies the health endpoint reports on.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    deps: Vec<Arc<DependencyHealth>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dep: Arc<DependencyHealth>) {
        self.deps.push(dep);
    }

    /// Names of all registered dependencies.
    pub fn service_names(&self) -> Vec<String> {
        self.deps.iter().map(|d| d.name().to_string()).collect()
    }

    /// Names of dependencies currently marked Down.
    pub fn unreachable(&self) -> Vec<String> {
        self.deps
            .iter()
            .filter(|d| !d.is_up())
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn all_up(&self) -> bool {
        self.deps.iter().all(|d| d.is_up())
    }
}
