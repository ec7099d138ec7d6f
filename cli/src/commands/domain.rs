//! `latent domain`: print the domain bound to this project.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;

/// Run `latent domain`. Prints only the domain, so it composes with scripts.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned or has no domain.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let domain = lifecycle::domain(&app.store).await?;
    println!("{domain}");
    Ok(ExitCode::SUCCESS)
}
