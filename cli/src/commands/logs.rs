//! `latent logs`: follow the service journal until interrupted.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::{LogOptions, follow_logs};

/// Arguments for the logs command.
#[derive(Args)]
pub struct LogsArgs {
    /// Number of past lines to show before following
    #[arg(short = 'n', long)]
    pub lines: Option<u32>,
}

/// Run `latent logs`. Ctrl-C ends the stream and exits successfully.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned, the host cannot be
/// reached, or the journal cannot be read.
pub async fn run(app: &AppContext, args: &LogsArgs) -> Result<ExitCode> {
    let opts = LogOptions { lines: args.lines };
    let mut print_line = |line: &str| println!("{line}");

    tokio::select! {
        result = follow_logs(&app.store, &app.connector, opts, &mut print_line) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("log stream interrupted");
        }
    }
    Ok(ExitCode::SUCCESS)
}
