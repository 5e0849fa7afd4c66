//! Worksteal - a work-stealing task scheduler
//!
//! This is the main entry point for the Worksteal CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use worksteal::config::{Config, LogFormat, LoggingConfig};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; logging depends on it
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            if cli.config.is_some() {
                eprintln!("Error: Failed to load config: {:#}", e);
                std::process::exit(1);
            }
            if cli.verbosity() >= 1 {
                eprintln!("Warning: Failed to load config: {:#}", e);
            }
            Config::default()
        }
    };

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), &config.logging);

    // Display version if verbose
    if cli.verbosity() >= 2 {
        eprintln!("Worksteal v{} by {}", VERSION, AUTHORS);
    }

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::Run(args) => args.execute(&mut ctx).await,
        Commands::Config(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            1
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match verbosity {
        0 => logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so JSON on stdout stays parseable
    match logging.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbosity >= 3),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
