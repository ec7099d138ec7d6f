//! Application service: prepare a host to receive Latent projects.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;

use crate::application::ports::{ProgressReporter, RemoteConnector, RemoteShell};
use crate::application::services::remote::{run_checked, stream_checked};
use crate::domain::RemoteCommand;
use crate::domain::remote::{PORTS_DIR, register_acme_account, show_acme_account};

/// Programs the provisioning pipeline and lifecycle commands call remotely.
pub const REQUIRED_TOOLS: [&str; 6] = ["git", "systemctl", "nginx", "certbot", "ss", "grep"];

/// Debian packages providing each installable tool. `systemctl` ships with
/// the init system and cannot be installed.
const PACKAGES: [(&str, &[&str]); 5] = [
    ("git", &["git"]),
    ("nginx", &["nginx"]),
    ("certbot", &["certbot", "python3-certbot-nginx"]),
    ("ss", &["iproute2"]),
    ("grep", &["grep"]),
];

/// Exits 0 when `$1` resolves to a command.
const HAS_COMMAND_SCRIPT: &str = r#"command -v "$1" >/dev/null 2>&1"#;

/// Caller-supplied settings for `server-setup`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerSetupOptions<'a> {
    /// Install missing tools with `apt-get`.
    pub install: bool,
    /// Contact address for the host's Let's Encrypt account.
    pub acme_email: Option<&'a str>,
}

/// What `server-setup` found on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerReport {
    /// Required tools that are not installed.
    pub missing_tools: Vec<&'static str>,
    /// Packages installed during this run.
    pub installed_packages: Vec<&'static str>,
    /// Whether certbot has an ACME account to issue certificates with.
    pub acme_account: bool,
}

impl ServerReport {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.missing_tools.is_empty() && self.acme_account
    }
}

/// Check the host for required tools, optionally install the missing ones,
/// create the port registry and register certbot's ACME account.
///
/// Missing tools are reported as warnings, not failures, so the operator
/// sees every gap in one run.
///
/// # Errors
///
/// Returns an error if the host cannot be reached, package installation or
/// account registration fails, or the registry directory cannot be created.
pub async fn setup_server(
    connector: &impl RemoteConnector,
    reporter: &impl ProgressReporter,
    opts: ServerSetupOptions<'_>,
) -> Result<ServerReport> {
    let shell = connector.connect().await?;
    let mut report = ServerReport::default();

    reporter.step("checking required tools");
    let mut missing = missing_tools(&shell).await?;
    if opts.install && !missing.is_empty() {
        let packages = packages_for(&missing);
        if !packages.is_empty() {
            reporter.step(&format!("installing {}", packages.join(" ")));
            install_packages(&shell, &packages, reporter).await?;
            report.installed_packages = packages;
            missing = missing_tools(&shell).await?;
        }
    }
    for tool in &missing {
        reporter.warn(&format!("{tool} is not installed"));
    }
    report.missing_tools = missing;

    reporter.step("creating port registry");
    run_checked(&shell, &RemoteCommand::new("mkdir").args(["-p", PORTS_DIR])).await?;
    reporter.success(&format!("port registry ready at {PORTS_DIR}"));

    if !report.missing_tools.contains(&"certbot") {
        reporter.step("checking Let's Encrypt account");
        ensure_acme_account(&shell, opts.acme_email).await?;
        report.acme_account = true;
        reporter.success("Let's Encrypt account ready");
    }

    Ok(report)
}

async fn missing_tools(shell: &impl RemoteShell) -> Result<Vec<&'static str>> {
    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        if has_command(shell, tool).await? {
            tracing::debug!(tool, "found");
        } else {
            missing.push(tool);
        }
    }
    Ok(missing)
}

/// Shells disagree on the exit code for a missing command, so any failure
/// counts as missing.
async fn has_command(shell: &impl RemoteShell, tool: &str) -> Result<bool> {
    let command = RemoteCommand::new("sh").args(["-c", HAS_COMMAND_SCRIPT, "sh", tool]);
    Ok(shell.exec(&command).await?.status.success())
}

fn packages_for(tools: &[&str]) -> Vec<&'static str> {
    PACKAGES
        .iter()
        .filter(|(tool, _)| tools.contains(tool))
        .flat_map(|(_, packages)| packages.iter().copied())
        .collect()
}

async fn install_packages(
    shell: &impl RemoteShell,
    packages: &[&str],
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let update = RemoteCommand::new("apt-get").args(["update", "-q"]);
    stream_checked(shell, &update, &mut |line| reporter.output(line)).await?;

    let install = RemoteCommand::new("env")
        .args(["DEBIAN_FRONTEND=noninteractive", "apt-get", "install", "-y", "-q"])
        .args(packages.iter().copied());
    stream_checked(shell, &install, &mut |line| reporter.output(line)).await?;
    tracing::info!(?packages, "installed packages");
    Ok(())
}

/// Register an ACME account unless certbot already has one.
async fn ensure_acme_account(shell: &impl RemoteShell, email: Option<&str>) -> Result<()> {
    if shell.exec(&show_acme_account()).await?.status.success() {
        tracing::debug!("ACME account already registered");
        return Ok(());
    }
    run_checked(shell, &register_acme_account(email)).await?;
    tracing::info!(email = email.unwrap_or("<none>"), "registered ACME account");
    Ok(())
}
