// Request tracking and CORS middleware

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::metrics::MetricsCollector;
use crate::routes::AppState;

/// Guard to ensure in-flight requests are decremented on drop
struct RequestGuard {
    metrics: Arc<MetricsCollector>,
    start_time: Instant,
    route: String,
    completed: bool,
}

impl RequestGuard {
    fn new(metrics: Arc<MetricsCollector>, route: String) -> Self {
        metrics.record_request_start();
        Self {
            metrics,
            start_time: Instant::now(),
            route,
            completed: false,
        }
    }

    fn complete(&mut self, is_error: bool) -> u64 {
        let latency_us = self.start_time.elapsed().as_micros() as u64;
        if !self.completed {
            self.metrics
                .record_request_end(&self.route, latency_us, is_error);
            self.completed = true;
        }
        latency_us
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.completed {
            // Request was cancelled (timeout or client gone)
            self.metrics.record_request_abandoned();
        }
    }
}

/// Pre-request hook
///
/// Logs which worker picked up the request and keeps the worker's
/// in-flight counter current for the duration of the handler.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    tracing::info!(
        "[{}] Worker {} received request: {} - {}",
        request_id,
        state.worker_id,
        request.method(),
        request.uri().path()
    );

    let mut guard = RequestGuard::new(state.metrics.clone(), route);
    let response = next.run(request).await;
    let status = response.status();
    let latency_us = guard.complete(status.is_server_error());

    tracing::debug!(
        "[{}] Worker {} finished with {} in {:.3}ms",
        request_id,
        state.worker_id,
        status,
        latency_us as f64 / 1000.0
    );

    response
}

/// Create CORS middleware layer
///
/// Configures CORS to allow all origins, methods, and headers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
