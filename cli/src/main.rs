//! Latent CLI - git-push-to-deploy for a single self-hosted server

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use latent_cli::cli::Cli;

/// Environment variable holding the log filter, e.g. `LATENT_LOG=debug`.
const LOG_ENV: &str = "LATENT_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
