//! `latent server-setup`: prepare the configured host and print DNS guidance.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::server_setup::{ServerSetupOptions, setup_server};

/// Arguments for the `latent server-setup` command.
#[derive(Args)]
pub struct ServerSetupArgs {
    /// Install missing tools (nginx, certbot, ...) with apt-get
    #[arg(long)]
    pub install: bool,

    /// Contact email for the Let's Encrypt account [default: from client-setup]
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,
}

/// Run `latent server-setup`.
///
/// # Errors
///
/// Returns an error if the host cannot be reached or prepared.
pub async fn run(app: &AppContext, args: &ServerSetupArgs) -> Result<ExitCode> {
    let ctx = &app.output;
    let config = app.config_store.load()?;
    let opts = ServerSetupOptions {
        install: args.install,
        acme_email: args.email.as_deref().or_else(|| config.acme_email()),
    };

    ctx.header(&format!("Setting up {}", config.host));
    let report = setup_server(&app.connector, &app.reporter(), opts).await?;
    if !report.missing_tools.is_empty() {
        let hint = if args.install {
            "Install them by hand before running 'latent init'"
        } else {
            "Re-run with --install, or install them before running 'latent init'"
        };
        ctx.warn(&format!(
            "Missing tools: {}. {hint}.",
            report.missing_tools.join(", ")
        ));
    }
    if !report.installed_packages.is_empty() {
        ctx.success(&format!("Installed {}", report.installed_packages.join(", ")));
    }

    ctx.dns_guidance(&config.host);
    Ok(ExitCode::SUCCESS)
}
