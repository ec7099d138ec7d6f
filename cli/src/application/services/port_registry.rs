//! Remote port registry: hands out one unique port per project ID.
//!
//! The registry lives on the remote host as one file per allocated port under
//! [`PORTS_DIR`], named by the port number and containing the owning ID.
//! Entry creation is exclusive (noclobber), so two allocators racing for the
//! same candidate cannot both win it; the liveness check against bound
//! listeners is best-effort.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;

use crate::application::ports::{PortCandidates, RemoteShell};
use crate::application::services::remote::{
    CLAIM_ENTRY_SCRIPT, command_failure, run_checked, test_exit,
};
use crate::domain::port::parse_registry_listing;
use crate::domain::remote::{PORTS_DIR, registry_entry};
use crate::domain::{PORT_RANGE, RegistryError, RemoteCommand, RetryPolicy};

/// Port registry bound to one remote channel.
pub struct PortRegistry<'a, S: RemoteShell> {
    shell: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: RemoteShell> PortRegistry<'a, S> {
    /// Create a registry using the default retry policy.
    pub fn new(shell: &'a S) -> Self {
        Self {
            shell,
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Find the port owned by `id`, if any. A host without a registry owns
    /// no ports.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be searched.
    pub async fn lookup(&self, id: &str) -> Result<Option<u16>> {
        let command = RemoteCommand::new("grep").args(["-rlxF", "-e", id, "--", PORTS_DIR]);
        let output = self.shell.exec(&command).await?;
        match output.status.code() {
            Some(0) => Ok(parse_registry_listing(
                PORTS_DIR,
                &String::from_utf8_lossy(&output.stdout),
            )),
            Some(1) => Ok(None),
            // grep exits 2 for an unreadable path as well as a missing one.
            Some(2) if !self.registry_exists().await? => Ok(None),
            _ => Err(command_failure(&command, &output).into()),
        }
    }

    /// Reserve a port for `id`, or return the one it already owns.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::PortAllocationExhausted`] if every candidate
    /// drawn under the retry policy was taken, or a remote error if the
    /// registry cannot be read or written.
    pub async fn allocate(&self, id: &str, candidates: &impl PortCandidates) -> Result<u16> {
        self.ensure_registry().await?;
        if let Some(port) = self.lookup(id).await? {
            tracing::debug!(id, port, "reusing registered port");
            return Ok(port);
        }

        for attempt in 1..=self.policy.max_attempts {
            let port = candidates.next_candidate();
            if self.accepts(port).await? && self.claim(port, id).await? {
                tracing::info!(id, port, attempt, "allocated port");
                return Ok(port);
            }
            tracing::warn!(id, port, attempt, "port candidate rejected");
            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.delay_after(attempt)).await;
            }
        }

        Err(RegistryError::PortAllocationExhausted {
            attempts: self.policy.max_attempts,
        }
        .into())
    }

    async fn ensure_registry(&self) -> Result<()> {
        run_checked(self.shell, &RemoteCommand::new("mkdir").args(["-p", PORTS_DIR])).await?;
        Ok(())
    }

    async fn registry_exists(&self) -> Result<bool> {
        test_exit(self.shell, &RemoteCommand::new("test").args(["-d", PORTS_DIR])).await
    }

    /// A candidate is acceptable when it is in range, unregistered, and not
    /// bound by a listener.
    async fn accepts(&self, port: u16) -> Result<bool> {
        if !PORT_RANGE.contains(&port) {
            return Ok(false);
        }
        if self.is_registered(port).await? {
            return Ok(false);
        }
        Ok(!self.is_listening(port).await?)
    }

    async fn is_registered(&self, port: u16) -> Result<bool> {
        test_exit(
            self.shell,
            &RemoteCommand::new("test").args(["-e".to_string(), registry_entry(port)]),
        )
        .await
    }

    async fn is_listening(&self, port: u16) -> Result<bool> {
        let command = RemoteCommand::new("ss").args([
            "-H".to_string(),
            "-l".to_string(),
            "-t".to_string(),
            "-n".to_string(),
            "sport".to_string(),
            "=".to_string(),
            format!(":{port}"),
        ]);
        let listeners = run_checked(self.shell, &command).await?;
        Ok(!listeners.trim().is_empty())
    }

    /// Create the registry entry for `port`. Returns `false` if another
    /// allocator created it first.
    async fn claim(&self, port: u16, id: &str) -> Result<bool> {
        let entry = registry_entry(port);
        let command =
            RemoteCommand::new("sh").args(["-c", CLAIM_ENTRY_SCRIPT, "sh", id, entry.as_str()]);
        let output = self.shell.exec(&command).await?;
        if output.status.success() {
            return Ok(true);
        }
        if self.is_registered(port).await? {
            tracing::debug!(port, "lost race for registry entry");
            return Ok(false);
        }
        Err(command_failure(&command, &output).into())
    }
}
