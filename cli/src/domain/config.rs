//! Domain types and validators for the host configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Host credentials stored in `~/.latent/config.yaml`.
///
/// Every field except `port` must be present in the file. An empty
/// `password` selects key or agent authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name or IP address of the server.
    pub host: String,
    /// SSH login user.
    pub username: String,
    /// SSH password.
    pub password: String,
    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Contact address for the host's Let's Encrypt account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl HostConfig {
    /// Validates that required values are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("host", &self.host), ("username", &self.username)] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                }
                .into());
            }
        }
        if self.port == 0 {
            return Err(ConfigError::MissingField {
                field: "port".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The ACME contact address, if one is set.
    #[must_use]
    pub fn acme_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// Whether password authentication is configured.
    #[must_use]
    pub fn uses_password(&self) -> bool {
        !self.password.is_empty()
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
