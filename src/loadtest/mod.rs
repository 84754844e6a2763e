//! Load-test client for the demo endpoints.
//!
//! Fires one batch of identical GET requests concurrently and reports how
//! long the whole batch took:
//! - Runner that dispatches on one event loop or spread over worker threads
//! - HdrHistogram-based latency collection
//! - Report generation (table or JSON)

pub mod config;
pub mod metrics;
pub mod report;
pub mod runner;

pub use config::{DispatchMode, LoadTestConfig};
pub use metrics::LatencyCollector;
pub use report::LoadTestReport;
pub use runner::LoadTestRunner;
