use anyhow::Result;
use clap::Parser;
use perfgauge::cli::{Cli, CliHandler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing for logging; reports go to stdout, logs to stderr
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let handler = CliHandler::new(cli.config).await?;
    let outcome = handler.handle_command(cli.command).await?;
    std::process::exit(outcome.exit_code());
}
