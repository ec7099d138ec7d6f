//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::ports::ConfigStore;
use crate::domain::{ConfigError, HostConfig};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "LATENT_CONFIG";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
///
/// Without an explicit path the file is `$LATENT_CONFIG`, falling back to
/// `~/.latent/config.yaml`.
#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// A store backed by the file at `path`.
    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<HostConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Err(ConfigError::NotConfigured {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: HostConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn save(&self, config: &HostConfig) -> Result<()> {
        config.validate()?;
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        write_private(&path, content.as_bytes())
            .with_context(|| format!("cannot write {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".latent").join("config.yaml"))
    }
}

/// Write `content` to `path`, readable by the owner only. A new file is
/// created with mode 0600; an existing file is narrowed to 0600 before it is
/// truncated.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let file = options.open(path)?;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        write_all_truncated(file, content)
    }
    #[cfg(not(unix))]
    {
        write_all_truncated(options.open(path)?, content)
    }
}

fn write_all_truncated(mut file: std::fs::File, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    file.set_len(0)?;
    file.write_all(content)?;
    file.sync_all()
}
