use axum::{
    extract::{Path, State},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::ApiError;
use crate::metrics::MetricsCollector;
use crate::middleware;
use crate::offload::OffloadPool;
use crate::resmon;
use crate::workload::{self, TestMatrix};

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers of one worker
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matrix: Arc<TestMatrix>,
    pub offload: OffloadPool,
    pub metrics: Arc<MetricsCollector>,
    pub worker_id: usize,
}

impl AppState {
    /// Build state with a freshly generated matrix
    pub fn new(config: Arc<Config>, worker_id: usize) -> Self {
        let matrix = Arc::new(TestMatrix::generate(config.matrix_size, config.matrix_seed));
        Self::with_matrix(config, matrix, worker_id)
    }

    /// Build state around an already generated matrix
    pub fn with_matrix(config: Arc<Config>, matrix: Arc<TestMatrix>, worker_id: usize) -> Self {
        Self {
            offload: OffloadPool::new(config.offload_pool_size),
            metrics: Arc::new(MetricsCollector::new()),
            config,
            matrix,
            worker_id,
        }
    }
}

/// Service routes: liveness, health and worker metrics
pub fn service_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Demonstration routes under `/test`
pub fn test_routes(state: AppState) -> Router {
    Router::new()
        .route("/test/calibrate", get(calibrate_handler))
        .route("/test/resmon", get(resmon_handler))
        .route("/test/:ssid/:data", get(echo_handler))
        .route("/test/mirrored/:ssid/:data", get(echo_handler))
        .route("/test/sync-cpubound/:iterations", get(sync_cpubound_handler))
        .route(
            "/test/badasync-cpubound/:iterations",
            get(badasync_cpubound_handler),
        )
        .route("/test/async-IObound/:iterations", get(async_iobound_handler))
        .route("/test/multiproctest/:data", get(multiproc_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .with_state(state)
}

/// GET / - Simple liveness check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Loop Contrast is running",
        "version": VERSION
    }))
}

/// GET /health - Health check with timestamp and worker id
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION,
        "worker": state.worker_id
    }))
}

/// GET /metrics - Counters for the worker that served this request
async fn metrics_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "worker": state.worker_id,
        "metrics": state.metrics.snapshot()
    }))
}

/// GET /test/{ssid}/{data} - Reflect the request back
async fn echo_handler(Path((ssid, data)): Path<(String, String)>) -> Json<Value> {
    tracing::info!("Mirroring test: {}", ssid);

    Json(json!({
        "result": "mirroring-test",
        "message": "Alive",
        "ssid": ssid,
        "data": data
    }))
}

/// GET /test/calibrate - Time a single unit of work
async fn calibrate_handler(State(state): State<AppState>) -> Json<Value> {
    let elapsed = workload::run_units(&state.matrix, 1);
    tracing::debug!("Calibrated one work unit: {:?}", elapsed);

    Json(json!({
        "message": "Calibration",
        "result": elapsed.as_secs_f64()
    }))
}

/// GET /test/sync-cpubound/{iterations}
///
/// Runs every iteration inline. Nothing else on this worker is served
/// until the loop finishes.
async fn sync_cpubound_handler(
    State(state): State<AppState>,
    Path(iterations): Path<u32>,
) -> Json<Value> {
    let elapsed = workload::run_units(&state.matrix, iterations);

    Json(json!({
        "message": "Sync CPU-bound",
        "result": elapsed.as_secs_f64()
    }))
}

/// GET /test/badasync-cpubound/{iterations}
///
/// Async in signature only: each iteration does a work unit and then a
/// thread sleep, with no await point anywhere in the loop.
async fn badasync_cpubound_handler(
    State(state): State<AppState>,
    Path(iterations): Path<u32>,
) -> Json<Value> {
    let delay = state.config.io_delay();
    let start = Instant::now();

    for _ in 0..iterations {
        state.matrix.square();
        std::thread::sleep(delay);
    }

    let elapsed = start.elapsed();

    Json(json!({
        "message": "Bad async CPU-bound",
        "result": elapsed.as_secs_f64(),
        "concurrent_tasks": state.metrics.active_requests()
    }))
}

/// GET /test/async-IObound/{iterations}
///
/// Yields to the scheduler on every iteration.
async fn async_iobound_handler(
    State(state): State<AppState>,
    Path(iterations): Path<u32>,
) -> Json<Value> {
    let delay = state.config.io_delay();
    let start = Instant::now();

    for _ in 0..iterations {
        tokio::time::sleep(delay).await;
    }

    let elapsed = start.elapsed();

    Json(json!({
        "message": "Async IO-bound",
        "result": elapsed.as_secs_f64(),
        "concurrent_tasks": state.metrics.active_requests()
    }))
}

/// GET /test/multiproctest/{data}
///
/// Hands one work unit to the offload pool, then waits one I/O delay.
async fn multiproc_handler(
    State(state): State<AppState>,
    Path(data): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();

    let matrix = state.matrix.clone();
    state.offload.run(move || matrix.square()).await?;
    tokio::time::sleep(state.config.io_delay()).await;

    let elapsed = start.elapsed();

    Ok(Json(json!({
        "result": elapsed.as_secs_f64(),
        "message": "Offloaded to worker pool",
        "mirrored": data
    })))
}

/// GET /test/resmon - Raw output of the resource monitor command
async fn resmon_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let output = resmon::snapshot(&state.config.resmon_command).await?;

    Ok(Json(json!({
        "message": "Resource snapshot",
        "result": output
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_state() -> AppState {
        let config = Config {
            matrix_size: 64,
            io_delay_ms: 5,
            offload_pool_size: 2,
            resmon_command: "echo snapshot".to_string(),
            ..Default::default()
        };
        AppState::new(Arc::new(config), 3)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_root_handler() {
        let json = root_handler().await;
        let value = json.0;

        assert_eq!(value["status"], "ok");
        assert_eq!(value["version"], VERSION);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let json = health_handler(State(create_test_state())).await;
        let value = json.0;

        assert_eq!(value["status"], "healthy");
        assert!(value["timestamp"].is_string());
        assert_eq!(value["worker"], 3);
    }

    #[tokio::test]
    async fn test_echo_handler() {
        let json = echo_handler(Path(("abc".to_string(), "xyz".to_string()))).await;
        let value = json.0;

        assert_eq!(value["result"], "mirroring-test");
        assert_eq!(value["message"], "Alive");
        assert_eq!(value["ssid"], "abc");
        assert_eq!(value["data"], "xyz");
    }

    #[tokio::test]
    async fn test_calibrate_is_positive() {
        let (status, body) = get_json(test_routes(create_test_state()), "/test/calibrate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Calibration");
        assert!(body["result"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_static_routes_win_over_echo() {
        let app = test_routes(create_test_state());
        let (_, body) = get_json(app.clone(), "/test/sync-cpubound/2").await;
        assert_eq!(body["message"], "Sync CPU-bound");

        let (_, body) = get_json(app, "/test/other/2").await;
        assert_eq!(body["ssid"], "other");
    }

    #[tokio::test]
    async fn test_invalid_iterations_rejected() {
        let app = test_routes(create_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test/sync-cpubound/many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_badasync_waits_at_least_delay_per_iteration() {
        let (status, body) = get_json(
            test_routes(create_test_state()),
            "/test/badasync-cpubound/3",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["result"].as_f64().unwrap() >= 0.015);
        assert_eq!(body["concurrent_tasks"], 1);
    }

    #[tokio::test]
    async fn test_async_iobound_waits_at_least_delay_per_iteration() {
        let (status, body) =
            get_json(test_routes(create_test_state()), "/test/async-IObound/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Async IO-bound");
        assert!(body["result"].as_f64().unwrap() >= 0.015);
        assert_eq!(body["concurrent_tasks"], 1);
    }

    #[tokio::test]
    async fn test_multiproc_mirrors_data() {
        let (status, body) = get_json(
            test_routes(create_test_state()),
            "/test/multiproctest/payload",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mirrored"], "payload");
        assert!(body["result"].as_f64().unwrap() >= 0.005);
    }

    #[tokio::test]
    async fn test_multiproc_closed_pool_is_500() {
        let state = create_test_state();
        state.offload.close();
        let (status, body) = get_json(test_routes(state), "/test/multiproctest/x").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "offload_error");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resmon_returns_output() {
        let (status, body) = get_json(test_routes(create_test_state()), "/test/resmon").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"].as_str().unwrap().trim(), "snapshot");
    }

    #[tokio::test]
    async fn test_metrics_handler_reports_worker() {
        let state = create_test_state();
        let _ = get_json(test_routes(state.clone()), "/test/calibrate").await;

        let json = metrics_handler(State(state)).await;
        let value = json.0;
        assert_eq!(value["worker"], 3);
        assert_eq!(value["metrics"]["total"], 1);
        assert_eq!(value["metrics"]["routes"][0]["route"], "/test/calibrate");
    }
}
