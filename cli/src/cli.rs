//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::application::services::lifecycle::UnitAction;
use crate::commands;

/// Git-push-to-deploy for a single self-hosted server
#[derive(Parser)]
#[command(
    name = "latent",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision this directory on the configured host
    Init(commands::init::InitArgs),

    /// Start the project's service
    Start,

    /// Stop the project's service
    Stop,

    /// Restart the project's service
    Restart,

    /// Show the service status
    Status,

    /// Follow the service logs
    Logs(commands::logs::LogsArgs),

    /// Print the project's domain
    Domain,

    /// Configure the host to deploy to
    ClientSetup,

    /// Prepare the host to receive projects
    ServerSetup(commands::server_setup::ServerSetupArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(&AppFlags { no_color, quiet })?;
        match command {
            Command::Init(args) => commands::init::run(&app, &args).await,
            Command::Start => commands::control::run(&app, UnitAction::Start).await,
            Command::Stop => commands::control::run(&app, UnitAction::Stop).await,
            Command::Restart => commands::control::run(&app, UnitAction::Restart).await,
            Command::Status => commands::status::run(&app).await,
            Command::Logs(args) => commands::logs::run(&app, &args).await,
            Command::Domain => commands::domain::run(&app).await,
            Command::ClientSetup => commands::client_setup::run(&app),
            Command::ServerSetup(args) => commands::server_setup::run(&app, &args).await,
        }
    }
}
