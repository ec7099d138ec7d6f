//! `latent init`: provision this directory on the configured host.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::provision::{ProvisionOptions, provision};
use crate::domain::{HostConfig, RetryPolicy};
use crate::infra::fs::RandomPorts;

/// Arguments for the `latent init` command.
#[derive(Args)]
pub struct InitArgs {
    /// Domain to serve the project under (e.g. app.example.com).
    /// Without one, the project is served at `<id>.<any wildcard domain>`.
    pub domain: Option<String>,

    /// Continue a provisioning run that was interrupted.
    #[arg(long, conflicts_with = "domain")]
    pub resume: bool,
}

/// Run `latent init`.
///
/// # Errors
///
/// Returns an error naming the provisioning step that failed.
pub async fn run(app: &AppContext, args: &InitArgs) -> Result<ExitCode> {
    let ctx = &app.output;
    let reporter = app.reporter();
    let project = app.project_dir();
    // A missing or invalid config is reported by the connect step.
    let host = app.config_store.load().ok();

    ctx.header("Provisioning project");
    let outcome = provision(
        &app.connector,
        &app.store,
        &project,
        &RandomPorts,
        &reporter,
        ProvisionOptions {
            domain: args.domain.as_deref(),
            resume: args.resume,
            acme_email: host.as_ref().and_then(HostConfig::acme_email),
            retry: RetryPolicy::default(),
        },
    )
    .await?;

    ctx.project_summary(&outcome.record, outcome.port);
    Ok(ExitCode::SUCCESS)
}
