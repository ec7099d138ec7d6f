//! Application service: lifecycle control of a provisioned project.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//!
//! Every operation loads the project record first and fails with
//! [`ProjectError::NotProvisioned`] before any connection is attempted.
//! Each remote operation issues exactly one supervisor command.

use anyhow::Result;

use crate::application::ports::{
    ProgressReporter, ProjectStore, RemoteConnector, RemoteShell, StreamMode,
};
use crate::application::services::remote::{command_failure, stream_checked};
use crate::domain::remote::unit_name;
use crate::domain::{ProjectError, ProjectRecord, RemoteCommand};

/// Highest exit code `systemctl status` uses to describe a unit state.
const STATUS_MAX_STATE_CODE: i32 = 3;

/// Exit codes above this mean the local `ssh` was ended by a signal.
const SIGNAL_EXIT_BASE: i32 = 128;

/// Supervisor actions that change the running state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitAction {
    Start,
    Stop,
    Restart,
}

impl UnitAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    /// Past tense, for confirmation messages.
    #[must_use]
    pub fn done(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
        }
    }
}

/// Options for following the service journal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Number of past lines to show before following.
    pub lines: Option<u32>,
}

/// Load the project record.
///
/// # Errors
///
/// Returns [`ProjectError::NotProvisioned`] if the directory has no record.
pub async fn require_project(store: &impl ProjectStore) -> Result<ProjectRecord> {
    store.load_record().await?.ok_or_else(|| {
        ProjectError::NotProvisioned {
            dir: store.project_root().display().to_string(),
        }
        .into()
    })
}

/// Start, stop or restart the project's service, streaming the supervisor's
/// output to `reporter`.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned, the host cannot be
/// reached, or the supervisor command fails.
pub async fn control(
    store: &impl ProjectStore,
    connector: &impl RemoteConnector,
    reporter: &impl ProgressReporter,
    action: UnitAction,
) -> Result<ProjectRecord> {
    let record = require_project(store).await?;
    let shell = connector.connect().await?;
    let command = RemoteCommand::new("systemctl")
        .arg(action.as_str())
        .arg(unit_name(&record.id));
    stream_checked(&shell, &command, &mut |line| reporter.output(line)).await?;
    tracing::info!(id = %record.id, action = action.as_str(), "unit action completed");
    Ok(record)
}

/// Return the supervisor's status report for the project's service.
///
/// Exit codes 0 to 3 describe unit states (running, dead, unknown) and are
/// not failures.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned, the host cannot be
/// reached, or `systemctl` itself fails.
pub async fn status(
    store: &impl ProjectStore,
    connector: &impl RemoteConnector,
) -> Result<String> {
    let record = require_project(store).await?;
    let shell = connector.connect().await?;
    let command = RemoteCommand::new("systemctl").args([
        "status".to_string(),
        "--no-pager".to_string(),
        unit_name(&record.id),
    ]);
    let output = shell.exec(&command).await?;
    match output.status.code() {
        Some(code) if (0..=STATUS_MAX_STATE_CODE).contains(&code) => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        _ => Err(command_failure(&command, &output).into()),
    }
}

/// Follow the service journal, handing each line to `on_line`, until the
/// stream closes or the returned future is dropped.
///
/// # Errors
///
/// Returns an error if the directory is not provisioned, the host cannot be
/// reached, or `journalctl` exits with a failure.
pub async fn follow_logs(
    store: &impl ProjectStore,
    connector: &impl RemoteConnector,
    opts: LogOptions,
    on_line: &mut (dyn FnMut(&str) + Send),
) -> Result<()> {
    let record = require_project(store).await?;
    let shell = connector.connect().await?;
    let mut command = RemoteCommand::new("journalctl").args([
        "--follow".to_string(),
        "--no-pager".to_string(),
        "--unit".to_string(),
        unit_name(&record.id),
    ]);
    if let Some(lines) = opts.lines {
        command = command.args(["--lines".to_string(), lines.to_string()]);
    }

    let output = shell
        .exec_streaming(&command, StreamMode::Follow, on_line)
        .await?;
    match output.status.code() {
        Some(0) => Ok(()),
        Some(code) if code > SIGNAL_EXIT_BASE => {
            tracing::debug!(code, "log stream ended by signal");
            Ok(())
        }
        // Terminated by a signal without an exit code.
        None => Ok(()),
        Some(_) => Err(command_failure(&command, &output).into()),
    }
}

/// Return the domain bound to the project. Purely local.
///
/// # Errors
///
/// Returns [`ProjectError::NotProvisioned`] if the directory has no record,
/// or [`ProjectError::NoDomain`] if no domain was bound.
pub async fn domain(store: &impl ProjectStore) -> Result<String> {
    let record = require_project(store).await?;
    record.domain.ok_or_else(|| ProjectError::NoDomain.into())
}
