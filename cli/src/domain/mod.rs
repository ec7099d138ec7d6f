//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod port;
pub mod project;
pub mod provision;
pub mod remote;
pub mod template;

pub use config::HostConfig;
pub use error::{ConfigError, ProjectError, RegistryError, RemoteError, TemplateError};
pub use port::{PORT_RANGE, RetryPolicy};
pub use project::{ProjectRecord, ProvisionCheckpoint};
pub use provision::{ProvisionStep, StepFailed};
pub use remote::RemoteCommand;
pub use template::{TemplateContext, TemplateName};
