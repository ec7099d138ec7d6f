//! `latent status`: show the supervisor's view of the project's service.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;
use crate::output::progress;

/// Run `latent status`.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned or the host cannot
/// be queried.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let spinner = app
        .output
        .show_progress()
        .then(|| progress::waiting_on_host("Querying service status"));

    let result = lifecycle::status(&app.store, &app.connector).await;
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    print!("{}", result?);
    Ok(ExitCode::SUCCESS)
}
