//! Local project infrastructure: implements `ProjectDir` and `PortCandidates`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::Rng as _;

use crate::application::ports::{CommandRunner, PortCandidates, ProjectDir};
use crate::domain::PORT_RANGE;
use crate::domain::project::ENTRY_SCRIPT;

/// The project working tree, driven through the local `git` binary.
pub struct LocalProject<R: CommandRunner> {
    root: PathBuf,
    runner: R,
}

impl<R: CommandRunner> LocalProject<R> {
    pub fn new(root: PathBuf, runner: R) -> Self {
        Self { root, runner }
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        let root = self.root.to_string_lossy();
        let mut argv = vec!["-C", &*root];
        argv.extend_from_slice(args);
        self.runner.run("git", &argv).await
    }

    async fn git_checked(&self, args: &[&str]) -> Result<()> {
        let output = self.git(args).await?;
        anyhow::ensure!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }
}

impl<R: CommandRunner> ProjectDir for LocalProject<R> {
    fn has_entry_point(&self) -> bool {
        self.root.join(ENTRY_SCRIPT).is_file()
    }

    async fn link_remote(&self, name: &str, url: &str) -> Result<()> {
        let inside = self
            .git(&["rev-parse", "--is-inside-work-tree"])
            .await
            .context("git is required to link the project")?;
        if !inside.status.success() {
            self.git_checked(&["init"]).await?;
            tracing::info!(root = %self.root.display(), "initialized local git repository");
        }

        let existing = self.git(&["remote", "get-url", name]).await?;
        if existing.status.success() {
            self.git_checked(&["remote", "set-url", name, url]).await?;
        } else {
            self.git_checked(&["remote", "add", name, url]).await?;
        }
        tracing::info!(remote = name, url, "linked git remote");
        Ok(())
    }
}

/// Draws port candidates uniformly from [`PORT_RANGE`].
pub struct RandomPorts;

impl PortCandidates for RandomPorts {
    fn next_candidate(&self) -> u16 {
        rand::thread_rng().gen_range(PORT_RANGE)
    }
}
