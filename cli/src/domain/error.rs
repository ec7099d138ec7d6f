//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Project errors ────────────────────────────────────────────────────────────

/// Errors related to the local project directory and its record.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("This directory has already been set up (found {record}).")]
    AlreadyProvisioned { record: String },

    #[error("To set up a Latent project, you need an {entry} file in {dir}.")]
    MissingEntryPoint { entry: String, dir: String },

    #[error("{dir} is not a Latent directory. Run 'latent init' first.")]
    NotProvisioned { dir: String },

    #[error("Invalid project ID: {0}")]
    InvalidId(String),

    #[error("Invalid domain '{0}': expected a hostname such as example.com")]
    InvalidDomain(String),

    #[error("No domain was set for this project.")]
    NoDomain,

    #[error("Provisioning of project {id} did not finish. Run 'latent init --resume' to continue.")]
    InterruptedProvisioning { id: String },

    #[error("Nothing to resume: no unfinished provisioning found in this directory.")]
    NothingToResume,
}

// ── Remote errors ─────────────────────────────────────────────────────────────

/// Errors raised by the remote execution channel.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot reach {host}: {detail}")]
    ConnectivityFailure { host: String, detail: String },

    #[error("authentication to {host} as {username} failed. Check 'latent client-setup'.")]
    AuthenticationFailure { host: String, username: String },

    #[error("remote command `{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("remote command `{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("invalid argument for remote command `{program}`: {reason}")]
    InvalidArgument { program: String, reason: String },
}

// ── Port registry errors ──────────────────────────────────────────────────────

/// Errors raised by the remote port registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no free port found after {attempts} attempts")]
    PortAllocationExhausted { attempts: u32 },
}

// ── Template errors ───────────────────────────────────────────────────────────

/// Errors raised while rendering an embedded template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template '{0}' (expected one of: unit, route, hook)")]
    UnknownTemplate(String),

    #[error("template '{template}' requires field '{field}'")]
    MissingField { template: String, field: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to the host configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No host configured ({path} not found). Run 'latent client-setup' first.")]
    NotConfigured { path: String },

    #[error("Host configuration is missing a value for '{field}'. Run 'latent client-setup'.")]
    MissingField { field: String },
}
