//! Configuration structs for load testing.

use serde::{Deserialize, Serialize};

/// Default target: the I/O-bound endpoint with 50 iterations
pub const DEFAULT_TARGET_URL: &str = "http://localhost:5000/test/async-IObound/50";

/// Default batch size
pub const DEFAULT_REQUESTS: usize = 20;

/// How requests in a batch are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Every request on a single event loop
    Gather,
    /// Requests split over worker threads, one event loop each
    #[default]
    Workers,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Gather => write!(f, "gather"),
            DispatchMode::Workers => write!(f, "workers"),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gather" => Ok(DispatchMode::Gather),
            "workers" => Ok(DispatchMode::Workers),
            _ => Err(format!("Unknown dispatch mode: {}", s)),
        }
    }
}

/// Configuration for one load-test batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestConfig {
    /// Full URL every request is sent to
    pub target_url: String,
    /// Number of requests in the batch
    pub requests: usize,
    /// Worker threads in `Workers` mode
    pub workers: usize,
    /// Dispatch mode
    pub mode: DispatchMode,
    /// Per-request timeout in seconds; 0 disables it
    pub timeout_secs: u64,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            requests: DEFAULT_REQUESTS,
            workers: 4,
            mode: DispatchMode::Workers,
            timeout_secs: 300,
        }
    }
}

impl LoadTestConfig {
    /// Worker threads actually used for this batch
    pub fn effective_workers(&self) -> usize {
        match self.mode {
            DispatchMode::Gather => 1,
            DispatchMode::Workers => self.workers.clamp(1, self.requests.max(1)),
        }
    }
}
