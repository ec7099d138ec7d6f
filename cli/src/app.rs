//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the output context and the production adapters, all
//! rooted at the current working directory. Nothing here touches the network:
//! the host configuration is read when a command first connects.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::infra::command_runner::{DEFAULT_EXEC_TIMEOUT, TokioCommandRunner};
use crate::infra::config::YamlConfigStore;
use crate::infra::fs::LocalProject;
use crate::infra::ssh::SshConnector;
use crate::infra::state::ProjectFiles;
use crate::output::{OutputContext, TerminalReporter};

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Project directory the command operates on.
    pub root: PathBuf,
    /// Project record and checkpoint files.
    pub store: ProjectFiles,
    /// Host configuration file.
    pub config_store: YamlConfigStore,
    /// Opens channels to the configured host.
    pub connector: SshConnector<YamlConfigStore>,
}

impl AppContext {
    /// Construct an `AppContext` for the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let root = std::env::current_dir().context("cannot determine current directory")?;
        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            store: ProjectFiles::new(root.clone()),
            root,
            config_store: YamlConfigStore::default(),
            connector: SshConnector::new(YamlConfigStore::default()),
        })
    }

    /// Progress reporter writing to the terminal.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// The local working tree, driven through `git`.
    #[must_use]
    pub fn project_dir(&self) -> LocalProject<TokioCommandRunner> {
        LocalProject::new(self.root.clone(), TokioCommandRunner::new(DEFAULT_EXEC_TIMEOUT))
    }
}
