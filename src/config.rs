use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Loop Contrast - blocking vs non-blocking request handling demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "5000")]
    pub port: u16,

    /// Serving flavor (event-loop or prefork)
    #[arg(short, long, env = "SERVER_FLAVOR", value_enum, default_value = "event-loop")]
    pub flavor: Flavor,

    /// Number of workers in prefork flavor
    #[arg(short, long, env = "SERVER_WORKERS", default_value = "5")]
    pub workers: usize,

    /// Request timeout in seconds (0 disables the timeout)
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "0")]
    pub request_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Side length of the test matrix
    #[arg(long, env = "MATRIX_SIZE", default_value = "1000")]
    pub matrix_size: usize,

    /// Seed for the test matrix
    #[arg(long, env = "MATRIX_SEED", default_value = "42")]
    pub matrix_seed: u64,

    /// Delay per iteration for the sleeping endpoints, in milliseconds
    #[arg(long, env = "IO_DELAY_MS", default_value = "100")]
    pub io_delay_ms: u64,

    /// Maximum concurrent jobs in the offload pool
    #[arg(long, env = "OFFLOAD_POOL_SIZE", default_value = "4")]
    pub offload_pool_size: usize,

    /// Command line for the resource monitor snapshot
    #[arg(long, env = "RESMON_COMMAND", default_value = "top -b -n 1")]
    pub resmon_command: String,
}

/// How the server schedules incoming requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Flavor {
    /// One cooperative scheduler for every connection
    EventLoop,
    /// Fixed number of workers, each with its own scheduler
    Prefork,
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flavor::EventLoop => write!(f, "event-loop"),
            Flavor::Prefork => write!(f, "prefork"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,
    pub flavor: Flavor,
    pub workers: usize,
    pub request_timeout_secs: u64,

    // Logging
    pub log_level: String,
    pub log_file: Option<PathBuf>,

    // Workload
    pub matrix_size: usize,
    pub matrix_seed: u64,
    pub io_delay_ms: u64,
    pub offload_pool_size: usize,

    // Resource monitor
    pub resmon_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 5000,
            flavor: Flavor::EventLoop,
            workers: 5,
            request_timeout_secs: 0,
            log_level: "info".to_string(),
            log_file: None,
            matrix_size: 1000,
            matrix_seed: 42,
            io_delay_ms: 100,
            offload_pool_size: 4,
            resmon_command: "top -b -n 1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > .env > defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Ok(Self::from_args(args))
    }

    /// Build configuration from already parsed arguments
    pub fn from_args(args: CliArgs) -> Self {
        Config {
            server_host: args.host,
            server_port: args.port,
            flavor: args.flavor,
            workers: args.workers,
            request_timeout_secs: args.request_timeout,
            log_level: args.log_level,
            log_file: args.log_file,
            matrix_size: args.matrix_size,
            matrix_seed: args.matrix_seed,
            io_delay_ms: args.io_delay_ms,
            offload_pool_size: args.offload_pool_size,
            resmon_command: args.resmon_command,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("SERVER_WORKERS must be at least 1");
        }
        if self.matrix_size == 0 {
            anyhow::bail!("MATRIX_SIZE must be at least 1");
        }
        if self.offload_pool_size == 0 {
            anyhow::bail!("OFFLOAD_POOL_SIZE must be at least 1");
        }
        if self.resmon_command.trim().is_empty() {
            anyhow::bail!("RESMON_COMMAND cannot be empty");
        }

        Ok(())
    }

    /// Listening address as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Per-iteration delay used by the sleeping endpoints
    pub fn io_delay(&self) -> Duration {
        Duration::from_millis(self.io_delay_ms)
    }

    /// Request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Number of schedulers the configured flavor runs
    pub fn effective_workers(&self) -> usize {
        match self.flavor {
            Flavor::EventLoop => 1,
            Flavor::Prefork => self.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_cli() {
        let args = CliArgs::parse_from(["loop-contrast"]);
        let config = Config::from_args(args);

        assert_eq!(config.server_port, 5000);
        assert_eq!(config.flavor, Flavor::EventLoop);
        assert_eq!(config.workers, 5);
        assert_eq!(config.request_timeout_secs, 0);
        assert_eq!(config.matrix_size, 1000);
        assert_eq!(config.resmon_command, "top -b -n 1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefork_flags() {
        let args = CliArgs::parse_from([
            "loop-contrast",
            "--flavor",
            "prefork",
            "--workers",
            "3",
            "--port",
            "8080",
        ]);
        let config = Config::from_args(args);

        assert_eq!(config.flavor, Flavor::Prefork);
        assert_eq!(config.effective_workers(), 3);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_event_loop_has_one_worker() {
        let config = Config {
            workers: 8,
            ..Default::default()
        };
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_request_timeout_zero_disables() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), None);

        let config = Config {
            request_timeout_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_resmon_command() {
        let config = Config {
            resmon_command: "   ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_matrix_and_pool() {
        let config = Config {
            matrix_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            offload_pool_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flavor_display() {
        assert_eq!(Flavor::EventLoop.to_string(), "event-loop");
        assert_eq!(Flavor::Prefork.to_string(), "prefork");
    }
}
