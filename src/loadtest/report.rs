//! Report generation for load-test results.

use super::config::{DispatchMode, LoadTestConfig};
use super::metrics::LatencySnapshot;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one load-test batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestReport {
    pub target_url: String,
    pub mode: DispatchMode,
    pub workers: usize,
    pub requests: u64,
    /// Wall-clock time for the whole batch
    pub total_secs: f64,
    /// Sum of every request's own latency
    pub summed_latency_secs: f64,
    /// summed latency / wall-clock; about 1.0 when requests were serialized
    pub effective_concurrency: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_max_ms: f64,
}

impl LoadTestReport {
    /// Create a report from a finished batch
    pub fn new(
        config: &LoadTestConfig,
        workers: usize,
        elapsed: Duration,
        latencies: LatencySnapshot,
    ) -> Self {
        let total_secs = elapsed.as_secs_f64();
        let effective_concurrency = if total_secs > 0.0 {
            latencies.total_secs / total_secs
        } else {
            0.0
        };

        Self {
            target_url: config.target_url.clone(),
            mode: config.mode,
            workers,
            requests: latencies.count,
            total_secs,
            summed_latency_secs: latencies.total_secs,
            effective_concurrency,
            latency_p50_ms: latencies.p50_ms,
            latency_p95_ms: latencies.p95_ms,
            latency_p99_ms: latencies.p99_ms,
            latency_max_ms: latencies.max_ms,
        }
    }

    /// Print the report as an ASCII table
    pub fn print_table(&self) {
        println!();
        println!("╔══════════════════════════════════════════════════════════════════════════╗");
        println!("║                          LOAD TEST RESULTS                               ║");
        println!("╚══════════════════════════════════════════════════════════════════════════╝");
        println!();
        println!("  Target: {}", self.target_url);
        println!("  Mode:   {} ({} worker(s))", self.mode, self.workers);
        println!();
        println!("┌──────────┬───────────┬───────────┬──────────┬──────────┬──────────┬──────────┐");
        println!("│ Requests │ Total (s) │ Sum (s)   │ Overlap  │  p50(ms) │  p99(ms) │  max(ms) │");
        println!("├──────────┼───────────┼───────────┼──────────┼──────────┼──────────┼──────────┤");
        println!(
            "│ {:>8} │ {:>9.3} │ {:>9.3} │ {:>7.2}x │ {:>8.1} │ {:>8.1} │ {:>8.1} │",
            self.requests,
            self.total_secs,
            self.summed_latency_secs,
            self.effective_concurrency,
            self.latency_p50_ms,
            self.latency_p99_ms,
            self.latency_max_ms
        );
        println!("└──────────┴───────────┴───────────┴──────────┴──────────┴──────────┴──────────┘");
        println!();
    }

    /// Export the report as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
