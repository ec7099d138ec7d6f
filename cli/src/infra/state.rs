//! Infrastructure implementation of the `ProjectStore` port.
//!
//! `ProjectFiles` keeps `latent.json` and the provisioning checkpoint in the
//! project directory. Loads and saves run under `tokio::task::spawn_blocking`,
//! and every write is atomic (temp file + rename) so a crash never leaves a
//! half-written record behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::ProjectStore;
use crate::domain::project::{CHECKPOINT_FILE, RECORD_FILE, validate_project_id};
use crate::domain::{ProjectRecord, ProvisionCheckpoint};

/// Project state files rooted at one directory.
pub struct ProjectFiles {
    root: PathBuf,
}

impl ProjectFiles {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_FILE)
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.root.join(CHECKPOINT_FILE)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(value))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    content.push('\n');

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

async fn blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .with_context(|| format!("{what} task panicked"))?
}

impl ProjectStore for ProjectFiles {
    fn project_root(&self) -> &Path {
        &self.root
    }

    async fn load_record(&self) -> Result<Option<ProjectRecord>> {
        let path = self.record_path();
        blocking("record load", move || {
            let record: Option<ProjectRecord> = load_json(&path)?;
            if let Some(record) = &record {
                validate_project_id(&record.id)
                    .with_context(|| format!("invalid record {}", path.display()))?;
            }
            Ok(record)
        })
        .await
    }

    async fn save_record(&self, record: &ProjectRecord) -> Result<()> {
        let path = self.record_path();
        let record = record.clone();
        blocking("record save", move || save_json(&path, &record)).await
    }

    async fn load_checkpoint(&self) -> Result<Option<ProvisionCheckpoint>> {
        let path = self.checkpoint_path();
        blocking("checkpoint load", move || {
            let checkpoint: Option<ProvisionCheckpoint> = load_json(&path)?;
            if let Some(checkpoint) = &checkpoint {
                validate_project_id(&checkpoint.id)
                    .with_context(|| format!("invalid checkpoint {}", path.display()))?;
            }
            Ok(checkpoint)
        })
        .await
    }

    async fn save_checkpoint(&self, checkpoint: &ProvisionCheckpoint) -> Result<()> {
        let path = self.checkpoint_path();
        let checkpoint = checkpoint.clone();
        blocking("checkpoint save", move || save_json(&path, &checkpoint)).await
    }

    async fn clear_checkpoint(&self) -> Result<()> {
        let path = self.checkpoint_path();
        blocking("checkpoint clear", move || {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
            }
            Ok(())
        })
        .await
    }
}
