//! Project domain types and pure validation functions.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ProjectError;

/// Record file marking a provisioned project directory.
pub const RECORD_FILE: &str = "latent.json";

/// Checkpoint file written while provisioning is in progress.
pub const CHECKPOINT_FILE: &str = ".latent-provision.json";

/// Script every project must provide; the service unit runs it.
pub const ENTRY_SCRIPT: &str = "entry.sh";

/// Name of the local git remote pointing at the provisioned repository.
pub const DEPLOY_REMOTE: &str = "deploy";

/// Length of a project ID in hex characters.
const ID_LEN: usize = 16;

/// Project record persisted to `latent.json` at the project root.
///
/// Its presence is the only signal that a directory has been provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project identifier, fixed at provisioning time.
    pub id: String,
    /// Hostname bound to the project, if one was given to `latent init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Progress of an unfinished provisioning run, persisted to
/// `.latent-provision.json` so that `latent init --resume` can continue it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionCheckpoint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Number of the last step that completed.
    pub completed: u8,
    /// Port reserved for the project, once step 5 has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub started_at: DateTime<Utc>,
}

/// Validates project ID format: 16 lowercase hex characters.
///
/// # Errors
///
/// Returns an error if the ID doesn't match the expected format.
pub fn validate_project_id(id: &str) -> Result<()> {
    let well_formed = id.len() == ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if !well_formed {
        return Err(ProjectError::InvalidId(id.to_string()).into());
    }
    Ok(())
}

/// Generate a unique project identifier.
///
/// The ID doubles as a file name, a systemd unit prefix, and a DNS label, so
/// it is restricted to lowercase hex.
#[must_use]
pub fn generate_project_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Validates a domain name before it is written into remote configuration.
///
/// Accepts dot-separated labels of ASCII letters, digits and hyphens, with no
/// label starting or ending in a hyphen.
///
/// # Errors
///
/// Returns an error if the domain is not a plausible hostname.
pub fn validate_domain(domain: &str) -> Result<()> {
    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if domain.len() > 253 || !domain.contains('.') || !domain.split('.').all(valid_label) {
        return Err(ProjectError::InvalidDomain(domain.to_string()).into());
    }
    Ok(())
}
