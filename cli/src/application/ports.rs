//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{HostConfig, ProjectRecord, ProvisionCheckpoint, RemoteCommand};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Run a program, handing each stdout line to `on_line` as it arrives.
    ///
    /// The returned `Output` carries the exit status and captured stderr; its
    /// `stdout` is empty. With `timeout: None` the call only returns when the
    /// program exits or the future is dropped, which kills the child.
    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
        on_line: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Output>;
}

// ── Remote Execution Ports ────────────────────────────────────────────────────

/// How a streamed remote command is expected to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Finishes on its own; subject to the channel's timeout.
    Bounded,
    /// Runs until cancelled (e.g. `journalctl --follow`); no timeout, and the
    /// remote side is hung up when the caller drops the future.
    Follow,
}

/// An authenticated channel to the remote host.
///
/// Implementations quote the structured command themselves and map transport
/// failures (unreachable host, rejected credentials, timeouts) to
/// `RemoteError`. A non-zero exit of the remote program is returned in the
/// `Output`, not as an error.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run a command and capture its output.
    async fn exec(&self, command: &RemoteCommand) -> Result<Output>;
    /// Run a command with `input` piped to its stdin.
    async fn exec_with_stdin(&self, command: &RemoteCommand, input: &[u8]) -> Result<Output>;
    /// Run a command, handing each output line to `on_line` as it arrives.
    async fn exec_streaming(
        &self,
        command: &RemoteCommand,
        mode: StreamMode,
        on_line: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Output>;
    /// Git URL addressing `path` on the remote host.
    fn remote_url(&self, path: &str) -> String;
}

/// Opens a [`RemoteShell`] scoped to the caller.
///
/// The shell is released when dropped; nothing keeps a channel alive between
/// command invocations.
#[allow(async_fn_in_trait)]
pub trait RemoteConnector {
    type Shell: RemoteShell;

    /// Load credentials, connect, and verify that the host accepts them.
    async fn connect(&self) -> Result<Self::Shell>;
}

// ── Port Candidate Port ───────────────────────────────────────────────────────

/// Source of candidate port numbers for the registry.
pub trait PortCandidates {
    /// Draw the next candidate from `crate::domain::PORT_RANGE`.
    fn next_candidate(&self) -> u16;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
///
/// Reporters are shared with the line callbacks of streamed commands, hence
/// the `Sync` bound.
pub trait ProgressReporter: Sync {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Relay one line of output produced by a remote command.
    fn output(&self, line: &str);
}

// ── Local Project Ports ───────────────────────────────────────────────────────

/// Persistence of the project record and the provisioning checkpoint.
#[allow(async_fn_in_trait)]
pub trait ProjectStore {
    /// Directory the project lives in.
    fn project_root(&self) -> &Path;
    /// Load the project record, returning `None` if the directory is not provisioned.
    async fn load_record(&self) -> Result<Option<ProjectRecord>>;
    /// Persist the project record.
    async fn save_record(&self, record: &ProjectRecord) -> Result<()>;
    /// Load the checkpoint of an unfinished provisioning run.
    async fn load_checkpoint(&self) -> Result<Option<ProvisionCheckpoint>>;
    /// Persist the checkpoint.
    async fn save_checkpoint(&self, checkpoint: &ProvisionCheckpoint) -> Result<()>;
    /// Remove the checkpoint, if any.
    async fn clear_checkpoint(&self) -> Result<()>;
}

/// The local project working tree.
#[allow(async_fn_in_trait)]
pub trait ProjectDir {
    /// Whether the entry script exists.
    fn has_entry_point(&self) -> bool;
    /// Ensure the directory is a git repository whose remote `name` points at `url`.
    async fn link_remote(&self, name: &str, url: &str) -> Result<()>;
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts storage of the host configuration.
pub trait ConfigStore {
    /// Load and validate the host configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotConfigured` if no configuration file exists,
    /// or an error if it cannot be parsed or fails validation.
    fn load(&self) -> Result<HostConfig>;
    /// Persist the host configuration.
    fn save(&self, config: &HostConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
