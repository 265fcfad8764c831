//! credfetch CLI application
//!
//! Command-line interface for downloading files from servers that require
//! authentication and for managing the credential store.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use credfetch::cli::{handle_credentials, handle_download, Cli, Commands};
use credfetch::config::AppConfig;
use credfetch::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("credfetch v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &config, cli.global.quiet).await
        }
        Commands::Credentials(args) => {
            info!("Executing credentials command");
            handle_credentials(args, &config).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let explicit = cli.global.quiet || cli.global.verbose || cli.global.very_verbose;
    let log_level = if explicit {
        cli.log_level().to_string().to_lowercase()
    } else {
        config.logging.level.to_lowercase()
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("credfetch={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
