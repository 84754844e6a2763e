use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-route statistics
#[derive(Debug)]
pub struct RouteStats {
    pub request_count: AtomicU64,
    pub total_latency_us: AtomicU64,
}

impl RouteStats {
    /// Create new route statistics
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
        }
    }

    /// Record a completed request for this route
    pub fn record_request(&self, latency_us: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Get average latency in milliseconds
    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_us.load(Ordering::Relaxed);
        total as f64 / count as f64 / 1000.0
    }
}

impl Default for RouteStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Request counters for one worker.
///
/// `active_requests` is what the sleeping endpoints report as
/// `concurrent_tasks`: requests that entered the handler stack on this
/// worker and have not finished yet.
pub struct MetricsCollector {
    /// Requests currently in flight
    active_requests: AtomicU64,

    /// Lifetime total request count
    total_requests: AtomicU64,

    /// Lifetime count of 5xx responses
    total_errors: AtomicU64,

    /// Per-route statistics keyed by matched path
    per_route_stats: DashMap<String, RouteStats>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            active_requests: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            per_route_stats: DashMap::new(),
        }
    }

    /// Record the start of a request
    pub fn record_request_start(&self) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the end of a request
    pub fn record_request_end(&self, route: &str, latency_us: u64, is_error: bool) {
        self.active_requests.fetch_sub(1, Ordering::Relaxed);

        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }

        self.per_route_stats
            .entry(route.to_string())
            .or_default()
            .record_request(latency_us);
    }

    /// Record a request that was dropped before producing a response
    pub fn record_request_abandoned(&self) {
        self.active_requests.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get current in-flight requests
    pub fn active_requests(&self) -> u64 {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Get lifetime request count
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get lifetime error count
    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    /// Snapshot of every counter, routes sorted by path
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut routes: Vec<RouteSnapshot> = self
            .per_route_stats
            .iter()
            .map(|entry| RouteSnapshot {
                route: entry.key().clone(),
                count: entry.value().request_count.load(Ordering::Relaxed),
                avg_latency_ms: entry.value().avg_latency_ms(),
            })
            .collect();
        routes.sort_by(|a, b| a.route.cmp(&b.route));

        MetricsSnapshot {
            active: self.active_requests(),
            total: self.total_requests(),
            errors: self.total_errors(),
            routes,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a worker's counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub active: u64,
    pub total: u64,
    pub errors: u64,
    pub routes: Vec<RouteSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub route: String,
    pub count: u64,
    pub avg_latency_ms: f64,
}
