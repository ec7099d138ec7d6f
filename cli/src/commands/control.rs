//! `latent start`, `latent stop`, `latent restart`: drive the project's service.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle::{UnitAction, control};

/// Run a unit action against the project's service.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned or the action fails.
pub async fn run(app: &AppContext, action: UnitAction) -> Result<ExitCode> {
    let reporter = app.reporter();
    let record = control(&app.store, &app.connector, &reporter, action).await?;
    app.output
        .success(&format!("Service {} {}.", record.id, action.done()));
    Ok(ExitCode::SUCCESS)
}
