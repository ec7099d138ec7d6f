//! Infrastructure implementation of the remote execution ports over the
//! system `ssh` client.
//!
//! Every command is a fresh `ssh` invocation; nothing is multiplexed or kept
//! alive between calls. Password authentication goes through `sshpass -e`,
//! which reads the password from the child's `SSHPASS` environment variable,
//! so it never appears in any argument list.

use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{
    CommandRunner, ConfigStore, RemoteConnector, RemoteShell, StreamMode,
};
use crate::domain::{HostConfig, RemoteCommand, RemoteError};
use crate::infra::command_runner::{
    DEFAULT_EXEC_TIMEOUT, DEFAULT_STREAM_TIMEOUT, TimedOut, TokioCommandRunner,
};

/// Exit code `ssh` uses for its own failures (connection, authentication).
const SSH_FAILURE: i32 = 255;

/// `sshpass` exit code for a rejected password.
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// `sshpass` exit code for an unknown or changed host key.
const SSHPASS_HOST_KEY: i32 = 6;

/// Seconds `ssh` waits for the TCP connection.
const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Environment variable `sshpass -e` reads the password from.
pub const SSHPASS_ENV: &str = "SSHPASS";

/// A channel to one host, running each command through `ssh`.
pub struct SshChannel<R: CommandRunner> {
    runner: R,
    host: String,
    username: String,
    port: u16,
    password_auth: bool,
    exec_timeout: Duration,
    stream_timeout: Duration,
}

impl<R: CommandRunner> SshChannel<R> {
    /// Create a channel for `config`. When the config carries a password,
    /// `runner` must provide it to children as [`SSHPASS_ENV`].
    pub fn new(runner: R, config: &HostConfig) -> Self {
        Self {
            runner,
            host: config.host.clone(),
            username: config.username.clone(),
            port: config.port,
            password_auth: config.uses_password(),
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, exec: Duration, stream: Duration) -> Self {
        self.exec_timeout = exec;
        self.stream_timeout = stream;
        self
    }

    /// Program and arguments that run `line` on the host.
    #[must_use]
    pub fn invocation(&self, line: &str, tty: bool) -> (&'static str, Vec<String>) {
        let mut args = Vec::new();
        let program = if self.password_auth {
            args.extend(["-e".to_string(), "ssh".to_string()]);
            "sshpass"
        } else {
            "ssh"
        };
        args.extend([
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
        ]);
        if !self.password_auth {
            args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
        }
        if tty {
            args.push("-tt".to_string());
        }
        args.push(format!("{}@{}", self.username, self.host));
        args.push(line.to_string());
        (program, args)
    }

    /// Run `true` on the host to check that it is reachable and accepts the
    /// configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::AuthenticationFailure`] if the credentials are
    /// rejected, or [`RemoteError::ConnectivityFailure`] if the host cannot be
    /// reached or its key cannot be verified.
    pub async fn handshake(&self) -> Result<()> {
        let line = RemoteCommand::new("true").to_shell()?;
        let (program, args) = self.invocation(&line, false);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .runner
            .run_with_timeout(program, &args, self.exec_timeout)
            .await
            .map_err(|e| self.transport_error(&line, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(0) => {
                tracing::debug!(host = %self.host, port = self.port, "handshake succeeded");
                Ok(())
            }
            Some(SSHPASS_BAD_PASSWORD) if self.password_auth => Err(self.auth_failure().into()),
            Some(SSH_FAILURE) if stderr.contains("Permission denied") => {
                Err(self.auth_failure().into())
            }
            Some(SSHPASS_HOST_KEY) if self.password_auth => Err(RemoteError::ConnectivityFailure {
                host: self.host.clone(),
                detail: "host key verification failed".to_string(),
            }
            .into()),
            code => Err(RemoteError::ConnectivityFailure {
                host: self.host.clone(),
                detail: if stderr.is_empty() {
                    format!("ssh exited with code {}", code.unwrap_or(-1))
                } else {
                    stderr
                },
            }
            .into()),
        }
    }

    fn auth_failure(&self) -> RemoteError {
        RemoteError::AuthenticationFailure {
            host: self.host.clone(),
            username: self.username.clone(),
        }
    }

    /// Map a runner error, turning a timeout into [`RemoteError::Timeout`].
    fn transport_error(&self, line: &str, err: anyhow::Error) -> anyhow::Error {
        match err.downcast_ref::<TimedOut>() {
            Some(timed_out) => RemoteError::Timeout {
                command: line.to_string(),
                seconds: timed_out.seconds,
            }
            .into(),
            None => err.context(format!("running ssh to {}", self.host)),
        }
    }

    /// Reject outputs where `ssh` itself failed.
    fn check_transport(&self, output: Output) -> Result<Output> {
        if output.status.code() == Some(SSH_FAILURE) {
            return Err(RemoteError::ConnectivityFailure {
                host: self.host.clone(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }
}

impl<R: CommandRunner> RemoteShell for SshChannel<R> {
    async fn exec(&self, command: &RemoteCommand) -> Result<Output> {
        let line = command.to_shell()?;
        tracing::debug!(host = %self.host, command = %line, "remote exec");
        let (program, args) = self.invocation(&line, false);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .runner
            .run_with_timeout(program, &args, self.exec_timeout)
            .await
            .map_err(|e| self.transport_error(&line, e))?;
        self.check_transport(output)
    }

    async fn exec_with_stdin(&self, command: &RemoteCommand, input: &[u8]) -> Result<Output> {
        let line = command.to_shell()?;
        tracing::debug!(host = %self.host, command = %line, bytes = input.len(), "remote exec with stdin");
        let (program, args) = self.invocation(&line, false);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .runner
            .run_with_stdin(program, &args, input)
            .await
            .map_err(|e| self.transport_error(&line, e))?;
        self.check_transport(output)
    }

    async fn exec_streaming(
        &self,
        command: &RemoteCommand,
        mode: StreamMode,
        on_line: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Output> {
        let line = command.to_shell()?;
        tracing::debug!(host = %self.host, command = %line, ?mode, "remote stream");
        let (timeout, tty) = match mode {
            StreamMode::Bounded => (Some(self.stream_timeout), false),
            StreamMode::Follow => (None, true),
        };
        let (program, args) = self.invocation(&line, tty);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .runner
            .run_streaming(program, &args, timeout, on_line)
            .await
            .map_err(|e| self.transport_error(&line, e))?;
        self.check_transport(output)
    }

    fn remote_url(&self, path: &str) -> String {
        format!("ssh://{}@{}:{}{path}", self.username, self.host, self.port)
    }
}

/// Opens [`SshChannel`]s using the host configuration from a [`ConfigStore`].
///
/// The configuration is read on `connect`, so commands that fail on local
/// checks never need it.
pub struct SshConnector<C: ConfigStore> {
    config: C,
}

impl<C: ConfigStore> SshConnector<C> {
    pub fn new(config: C) -> Self {
        Self { config }
    }
}

impl<C: ConfigStore> RemoteConnector for SshConnector<C> {
    type Shell = SshChannel<TokioCommandRunner>;

    async fn connect(&self) -> Result<Self::Shell> {
        let config = self.config.load()?;
        let mut runner = TokioCommandRunner::new(DEFAULT_EXEC_TIMEOUT);
        if config.uses_password() {
            runner = runner.with_env(SSHPASS_ENV, config.password.clone());
        }
        let channel = SshChannel::new(runner, &config);
        channel.handshake().await?;
        tracing::info!(host = %config.host, user = %config.username, "connected");
        Ok(channel)
    }
}
