use anyhow::{Context, Result};
use loop_contrast::config::{Config, Flavor};
use loop_contrast::server;

fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    init_logging(&config)?;

    print_startup_banner(&config);
    tracing::info!("🚀 Loop Contrast starting...");
    tracing::debug!("Configuration: {:?}", config);

    server::run(config)
}

/// Initialize logging with the configured level, to stderr or a log file
fn init_logging(config: &Config) -> Result<()> {
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.init(),
    }

    Ok(())
}

/// Print startup banner
fn print_startup_banner(config: &Config) {
    let banner = r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                     🔁 Loop Contrast                      ║
║                                                           ║
║      Blocking vs non-blocking request handling demo       ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner);
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("  Server:      http://{}", config.bind_addr());
    println!("  Flavor:      {}", config.flavor);
    if config.flavor == Flavor::Prefork {
        println!("  Workers:     {}", config.workers);
    }
    println!(
        "  Matrix:      {}x{} (seed {})",
        config.matrix_size, config.matrix_size, config.matrix_seed
    );
    println!("  I/O delay:   {}ms", config.io_delay_ms);
    println!("  Offload:     {} slots", config.offload_pool_size);
    println!(
        "  Timeout:     {}",
        match config.request_timeout() {
            Some(t) => format!("{}s", t.as_secs()),
            None => "none".to_string(),
        }
    );
    println!("  Log Level:   {}", config.log_level);
    println!();
}
