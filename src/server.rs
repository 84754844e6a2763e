//! Serving flavors.
//!
//! - event-loop: one current-thread runtime serves every connection.
//! - prefork: `workers` OS threads, each with its own current-thread runtime,
//!   accept on the same listening socket.
//!
//! Both flavors share the router built by [`build_app`]. The test matrix is
//! generated once and shared read-only across workers.

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, Flavor};
use crate::middleware;
use crate::routes::{self, AppState};
use crate::workload::TestMatrix;

/// Build the application with all routes and middleware
pub fn build_app(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    let app = Router::new()
        .merge(routes::service_routes(state.clone()))
        .merge(routes::test_routes(state))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http());

    match timeout {
        Some(timeout) => app.layer(TimeoutLayer::new(timeout)),
        None => app,
    }
}

/// Run the server in the configured flavor until a shutdown signal arrives
pub fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    tracing::info!(
        "Generating {}x{} test matrix (seed {})",
        config.matrix_size,
        config.matrix_size,
        config.matrix_seed
    );
    let matrix = Arc::new(TestMatrix::generate(config.matrix_size, config.matrix_seed));

    let listener = std::net::TcpListener::bind(config.bind_addr())
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    listener.set_nonblocking(true)?;

    tracing::info!(
        "Starting server ({}) with {} worker(s) on http://{}",
        config.flavor,
        config.effective_workers(),
        config.bind_addr()
    );

    match config.flavor {
        Flavor::EventLoop => run_event_loop(config, matrix, listener),
        Flavor::Prefork => run_prefork(config, matrix, listener),
    }
}

fn run_event_loop(
    config: Arc<Config>,
    matrix: Arc<TestMatrix>,
    listener: std::net::TcpListener,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build event loop")?;

    runtime.block_on(async move {
        let state = AppState::with_matrix(config, matrix, 0);
        let listener = tokio::net::TcpListener::from_std(listener)?;

        axum::serve(listener, build_app(state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("👋 Server shutdown complete");
        Ok::<(), anyhow::Error>(())
    })
}

fn run_prefork(
    config: Arc<Config>,
    matrix: Arc<TestMatrix>,
    listener: std::net::TcpListener,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = spawn_workers(config, matrix, listener, shutdown_rx)?;

    let signal_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal loop")?;
    signal_runtime.block_on(shutdown_signal());

    shutdown_tx.send_replace(true);
    join_workers(workers)?;

    tracing::info!("👋 Server shutdown complete");
    Ok(())
}

/// Start one worker thread per configured worker, all accepting on `listener`.
///
/// Each worker stops once `shutdown` turns `true`.
pub fn spawn_workers(
    config: Arc<Config>,
    matrix: Arc<TestMatrix>,
    listener: std::net::TcpListener,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<Result<()>>>> {
    let mut handles = Vec::with_capacity(config.workers);

    for worker_id in 1..=config.workers {
        let listener = listener
            .try_clone()
            .context("Failed to share listening socket")?;
        let state = AppState::with_matrix(config.clone(), matrix.clone(), worker_id);
        let shutdown = shutdown.clone();

        let handle = std::thread::Builder::new()
            .name(format!("worker-{}", worker_id))
            .spawn(move || run_worker(state, listener, shutdown))
            .context("Failed to spawn worker thread")?;
        handles.push(handle);
    }

    Ok(handles)
}

fn run_worker(
    state: AppState,
    listener: std::net::TcpListener,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let worker_id = state.worker_id;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .with_context(|| format!("Failed to build event loop for worker {}", worker_id))?;

    let result = runtime.block_on(async move {
        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;
        tracing::info!("Worker {} initialized", worker_id);

        axum::serve(listener, build_app(state))
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        Ok::<(), anyhow::Error>(())
    });

    tracing::info!("Worker {} exiting", worker_id);
    result
}

/// Wait for every worker and surface the first failure
pub fn join_workers(handles: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    let mut first_error = None;

    for handle in handles {
        let outcome = handle
            .join()
            .map_err(|_| anyhow::anyhow!("Worker thread panicked"))
            .and_then(|result| result);
        if let Err(e) = outcome {
            tracing::error!("Worker failed: {:#}", e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Handle graceful shutdown signal
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn test_config() -> Config {
        Config {
            matrix_size: 8,
            io_delay_ms: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_app_serves_both_route_groups() {
        let state = AppState::new(Arc::new(test_config()), 0);
        let app = build_app(state);

        for uri in ["/", "/health", "/test/a/b"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = AppState::new(Arc::new(test_config()), 0);
        let response = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/nope/a/b/c")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_timeout_applies() {
        let config = Config {
            request_timeout_secs: 1,
            io_delay_ms: 400,
            ..test_config()
        };
        let state = AppState::new(Arc::new(config), 0);
        let response = build_app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/test/async-IObound/5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        // The cancelled request no longer counts as in flight
        assert_eq!(state.metrics.active_requests(), 0);
    }

    #[test]
    fn test_prefork_workers_stop_on_shutdown() {
        let config = Arc::new(Config {
            workers: 2,
            ..test_config()
        });
        let matrix = Arc::new(TestMatrix::generate(config.matrix_size, config.matrix_seed));
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = watch::channel(false);

        let handles = spawn_workers(config, matrix, listener, rx).unwrap();
        assert_eq!(handles.len(), 2);

        std::thread::sleep(Duration::from_millis(50));
        tx.send_replace(true);
        assert!(join_workers(handles).is_ok());
    }
}
