//! Load-test runner: one batch, dispatched concurrently.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::{DispatchMode, LoadTestConfig};
use super::metrics::LatencyCollector;
use super::report::LoadTestReport;

/// Runner that fires a batch of requests at the target
pub struct LoadTestRunner {
    config: LoadTestConfig,
}

impl LoadTestRunner {
    /// Create a new load-test runner
    pub fn new(config: LoadTestConfig) -> Self {
        Self { config }
    }

    /// Run the batch and block until every request has finished.
    ///
    /// The first failed request (transport error, timeout or non-2xx
    /// status) aborts the batch; there are no retries.
    pub fn run(&self) -> Result<LoadTestReport> {
        let latencies = Arc::new(LatencyCollector::new());
        let shares = match self.config.mode {
            DispatchMode::Gather => split_requests(self.config.requests, 1),
            DispatchMode::Workers => {
                split_requests(self.config.requests, self.config.effective_workers())
            }
        };

        tracing::info!(
            "Firing {} requests at {} ({} mode, {} worker(s))",
            self.config.requests,
            self.config.target_url,
            self.config.mode,
            shares.len()
        );

        let start = Instant::now();

        match self.config.mode {
            DispatchMode::Gather => {
                let share = shares.first().copied().unwrap_or(0);
                run_share(&self.config, share, &latencies)?;
            }
            DispatchMode::Workers => {
                let handles = shares
                    .iter()
                    .enumerate()
                    .map(|(worker_id, &share)| {
                        let config = self.config.clone();
                        let latencies = latencies.clone();
                        std::thread::Builder::new()
                            .name(format!("loadtest-{}", worker_id))
                            .spawn(move || run_share(&config, share, &latencies))
                            .context("Failed to spawn load-test worker")
                    })
                    .collect::<Result<Vec<_>>>()?;

                for handle in handles {
                    handle
                        .join()
                        .map_err(|_| anyhow::anyhow!("Load-test worker panicked"))??;
                }
            }
        }

        let elapsed = start.elapsed();
        tracing::info!("Batch finished in {:.3}s", elapsed.as_secs_f64());

        Ok(LoadTestReport::new(
            &self.config,
            shares.len(),
            elapsed,
            latencies.snapshot(),
        ))
    }
}

/// Split `requests` over `workers` as evenly as possible, dropping empty shares
pub fn split_requests(requests: usize, workers: usize) -> Vec<usize> {
    let workers = workers.max(1);
    let base = requests / workers;
    let extra = requests % workers;

    (0..workers)
        .map(|i| base + usize::from(i < extra))
        .filter(|&share| share > 0)
        .collect()
}

/// Run `count` requests concurrently on a fresh current-thread event loop
fn run_share(config: &LoadTestConfig, count: usize, latencies: &LatencyCollector) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build load-test event loop")?;

    runtime.block_on(async {
        let mut builder = reqwest::Client::builder();
        // 0 means no per-request timeout
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let requests = (0..count).map(|_| execute_single_request(&client, &config.target_url));
        for latency in try_join_all(requests).await? {
            latencies.record(latency);
        }

        Ok::<(), anyhow::Error>(())
    })
}

/// Execute a single request and return its latency
async fn execute_single_request(client: &reqwest::Client, url: &str) -> Result<Duration> {
    let start = Instant::now();

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Request failed with status: {}", response.status());
    }

    let body = response.bytes().await?;
    tracing::debug!("Response: {}", String::from_utf8_lossy(&body));

    Ok(start.elapsed())
}
