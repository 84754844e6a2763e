//! Load-test CLI
//!
//! Usage:
//!   cargo run --bin loadtest
//!   cargo run --bin loadtest -- --url http://localhost:5000/test/sync-cpubound/50 -n 20 -m gather

use clap::Parser;
use loop_contrast::loadtest::config::{DEFAULT_REQUESTS, DEFAULT_TARGET_URL};
use loop_contrast::loadtest::{DispatchMode, LoadTestConfig, LoadTestRunner};

#[derive(Parser)]
#[command(name = "loadtest")]
#[command(about = "Fire one concurrent batch of requests and time it")]
struct Cli {
    /// URL every request is sent to
    #[arg(short = 'u', long, default_value = DEFAULT_TARGET_URL)]
    url: String,

    /// Number of requests in the batch
    #[arg(short = 'n', long, default_value_t = DEFAULT_REQUESTS)]
    requests: usize,

    /// Worker threads (workers mode only)
    #[arg(short = 'w', long, default_value = "4")]
    workers: usize,

    /// Dispatch mode (gather or workers)
    #[arg(short = 'm', long, default_value = "workers")]
    mode: String,

    /// Per-request timeout in seconds (0 = no timeout)
    #[arg(short = 't', long, default_value = "300")]
    timeout: u64,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let mode: DispatchMode = cli.mode.parse().map_err(anyhow::Error::msg)?;
    let config = LoadTestConfig {
        target_url: cli.url,
        requests: cli.requests,
        workers: cli.workers,
        mode,
        timeout_secs: cli.timeout,
    };

    println!("Starting load test against {}", config.target_url);
    println!(
        "Requests: {}, Mode: {}, Workers: {}",
        config.requests,
        config.mode,
        config.effective_workers()
    );

    let report = LoadTestRunner::new(config).run()?;

    if cli.json {
        println!("{}", report.to_json());
    } else {
        report.print_table();
        println!("{:.3}", report.total_secs);
    }

    Ok(())
}
