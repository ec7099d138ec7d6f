//! Helpers for running structured commands over a [`RemoteShell`].
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::{RemoteShell, StreamMode};
use crate::domain::{RemoteCommand, RemoteError};

/// Writes stdin to `$1` and sets its mode to `$2`.
pub const WRITE_FILE_SCRIPT: &str = r#"cat > "$1" && chmod "$2" "$1""#;

/// Creates `$2` containing `$1`, failing if `$2` already exists.
pub const CLAIM_ENTRY_SCRIPT: &str = r#"set -C && printf '%s\n' "$1" > "$2""#;

/// Build the error for a remote command that exited non-zero.
#[must_use]
pub fn command_failure(command: &RemoteCommand, output: &Output) -> RemoteError {
    RemoteError::CommandFailed {
        command: command.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Run a command that must succeed and return its stdout.
///
/// # Errors
///
/// Returns the channel's error, or [`RemoteError::CommandFailed`] on a
/// non-zero exit.
pub async fn run_checked(shell: &impl RemoteShell, command: &RemoteCommand) -> Result<String> {
    let output = shell.exec(command).await?;
    if !output.status.success() {
        return Err(command_failure(command, &output).into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a yes/no test command: exit 0 means yes, exit 1 means no.
///
/// # Errors
///
/// Returns [`RemoteError::CommandFailed`] for any other exit code.
pub async fn test_exit(shell: &impl RemoteShell, command: &RemoteCommand) -> Result<bool> {
    let output = shell.exec(command).await?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(command_failure(command, &output).into()),
    }
}

/// Write `contents` to `path` on the remote host with the given octal mode.
///
/// The content travels over stdin, so it is never interpreted by a shell.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_file(
    shell: &impl RemoteShell,
    path: &str,
    contents: &str,
    mode: &str,
) -> Result<()> {
    let command = RemoteCommand::new("sh").args(["-c", WRITE_FILE_SCRIPT, "sh", path, mode]);
    let output = shell.exec_with_stdin(&command, contents.as_bytes()).await?;
    if !output.status.success() {
        return Err(command_failure(&command, &output).into());
    }
    tracing::debug!(path, mode, bytes = contents.len(), "wrote remote file");
    Ok(())
}

/// Stream a bounded command's output and require it to succeed.
///
/// # Errors
///
/// Returns the channel's error, or [`RemoteError::CommandFailed`] on a
/// non-zero exit.
pub async fn stream_checked(
    shell: &impl RemoteShell,
    command: &RemoteCommand,
    on_line: &mut (dyn FnMut(&str) + Send),
) -> Result<()> {
    let output = shell
        .exec_streaming(command, StreamMode::Bounded, on_line)
        .await?;
    if !output.status.success() {
        return Err(command_failure(command, &output).into());
    }
    Ok(())
}
