//! Latency collection using HdrHistogram for accurate percentile calculations.

use hdrhistogram::Histogram;
use std::sync::Mutex;
use std::time::Duration;

/// Thread-safe latency collector shared by every worker of a batch
pub struct LatencyCollector {
    /// Per-request latency (microseconds)
    histogram: Mutex<Histogram<u64>>,
    /// Sum of all recorded latencies (microseconds)
    total_us: Mutex<u128>,
}

impl LatencyCollector {
    /// Create a new latency collector
    pub fn new() -> Self {
        Self {
            // Latencies up to 10 minutes with 3 significant figures
            histogram: Mutex::new(
                Histogram::new_with_bounds(1, 600_000_000, 3)
                    .expect("static histogram bounds are valid"),
            ),
            total_us: Mutex::new(0),
        }
    }

    /// Record one completed request
    pub fn record(&self, latency: Duration) {
        let latency_us = latency.as_micros();
        if let Ok(mut hist) = self.histogram.lock() {
            hist.saturating_record((latency_us as u64).max(1));
        }
        if let Ok(mut total) = self.total_us.lock() {
            *total += latency_us;
        }
    }

    /// Number of recorded requests
    pub fn count(&self) -> u64 {
        self.histogram.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Sum of all latencies
    pub fn total(&self) -> Duration {
        let total_us = self.total_us.lock().map(|t| *t).unwrap_or(0);
        Duration::from_micros(total_us as u64)
    }

    /// Latency percentile in milliseconds
    pub fn percentile_ms(&self, percentile: f64) -> f64 {
        self.histogram
            .lock()
            .map(|h| h.value_at_percentile(percentile) as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    /// Slowest request in milliseconds
    pub fn max_ms(&self) -> f64 {
        self.histogram
            .lock()
            .map(|h| h.max() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    /// Create a snapshot of current latencies
    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            count: self.count(),
            total_secs: self.total().as_secs_f64(),
            p50_ms: self.percentile_ms(50.0),
            p95_ms: self.percentile_ms(95.0),
            p99_ms: self.percentile_ms(99.0),
            max_ms: self.max_ms(),
        }
    }
}

impl Default for LatencyCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of latencies at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySnapshot {
    pub count: u64,
    pub total_secs: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}
