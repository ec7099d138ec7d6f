//! The ordered steps of the provisioning pipeline.

use std::fmt;

use thiserror::Error;

/// One step of `latent init`, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisionStep {
    Validate,
    GenerateId,
    Connect,
    RemoteInit,
    AllocatePort,
    InstallUnit,
    InstallRoute,
    IssueCertificate,
    InstallHook,
    LinkLocalRecord,
}

impl ProvisionStep {
    /// All steps in execution order.
    pub const ALL: [ProvisionStep; 10] = [
        Self::Validate,
        Self::GenerateId,
        Self::Connect,
        Self::RemoteInit,
        Self::AllocatePort,
        Self::InstallUnit,
        Self::InstallRoute,
        Self::IssueCertificate,
        Self::InstallHook,
        Self::LinkLocalRecord,
    ];

    /// 1-based position of the step.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Validate => 1,
            Self::GenerateId => 2,
            Self::Connect => 3,
            Self::RemoteInit => 4,
            Self::AllocatePort => 5,
            Self::InstallUnit => 6,
            Self::InstallRoute => 7,
            Self::IssueCertificate => 8,
            Self::InstallHook => 9,
            Self::LinkLocalRecord => 10,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Validate => "validate directory",
            Self::GenerateId => "generate project id",
            Self::Connect => "connect to host",
            Self::RemoteInit => "initialize remote repository",
            Self::AllocatePort => "allocate port",
            Self::InstallUnit => "install service unit",
            Self::InstallRoute => "install proxy route",
            Self::IssueCertificate => "issue TLS certificate",
            Self::InstallHook => "install deploy hook",
            Self::LinkLocalRecord => "link local project",
        }
    }

    /// Whether a run whose checkpoint recorded `completed` still has to run
    /// this step.
    ///
    /// Connecting is never skipped: a resumed run needs a fresh channel.
    #[must_use]
    pub fn pending_after(self, completed: u8) -> bool {
        self == Self::Connect || self.number() > completed
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.number(), Self::ALL.len(), self.name())
    }
}

/// Context attached to the error of a failed pipeline step.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("provisioning step {step} failed")]
pub struct StepFailed {
    pub step: ProvisionStep,
}
