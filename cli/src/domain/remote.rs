//! Structured remote commands and the remote host filesystem layout.
//!
//! Commands are built from a program and a list of arguments and only turned
//! into shell text by [`RemoteCommand::to_shell`], which quotes every word.
//! User-controlled values such as domains and IDs therefore never reach the
//! remote shell unquoted.

use std::fmt;

use crate::domain::error::RemoteError;

/// Root directory for all Latent state on the remote host.
pub const REMOTE_ROOT: &str = "/opt/latent";

/// Directory holding one entry per allocated port.
pub const PORTS_DIR: &str = "/opt/latent/reserved/ports";

/// Directory holding systemd unit files.
pub const SYSTEMD_DIR: &str = "/etc/systemd/system";

/// Directory holding enabled nginx site files.
pub const NGINX_SITES_DIR: &str = "/etc/nginx/sites-enabled";

/// A program invocation to run on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
}

impl RemoteCommand {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Render the command as a single POSIX shell command line.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidArgument`] if any word contains a NUL
    /// byte, which no shell can represent.
    pub fn to_shell(&self) -> Result<String, RemoteError> {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words).map_err(|e| RemoteError::InvalidArgument {
            program: self.program.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_shell() {
            Ok(line) => f.write_str(&line),
            Err(_) => write!(f, "{} <{} args>", self.program, self.args.len()),
        }
    }
}

// ── Remote layout ─────────────────────────────────────────────────────────────

/// Git repository that receives pushes for a project.
#[must_use]
pub fn project_dir(id: &str) -> String {
    format!("{REMOTE_ROOT}/{id}")
}

/// Name of the systemd unit that runs a project.
#[must_use]
pub fn unit_name(id: &str) -> String {
    format!("{id}.latent.service")
}

#[must_use]
pub fn unit_path(id: &str) -> String {
    format!("{SYSTEMD_DIR}/{}", unit_name(id))
}

#[must_use]
pub fn route_path(id: &str) -> String {
    format!("{NGINX_SITES_DIR}/{id}-latent.conf")
}

#[must_use]
pub fn hook_path(id: &str) -> String {
    format!("{}/.git/hooks/post-receive", project_dir(id))
}

/// Registry entry recording the owner of `port`.
#[must_use]
pub fn registry_entry(port: u16) -> String {
    format!("{PORTS_DIR}/{port}")
}

// ── Certificates ──────────────────────────────────────────────────────────────

/// Obtain a certificate for `domain` and switch its nginx site to HTTPS.
///
/// The ACME terms are accepted up front so certbot never prompts, which also
/// lets it register an account on a host that has none.
#[must_use]
pub fn issue_certificate(domain: &str, email: Option<&str>) -> RemoteCommand {
    acme_contact(
        RemoteCommand::new("certbot").args([
            "--nginx",
            "-d",
            domain,
            "--redirect",
            "--non-interactive",
            "--agree-tos",
        ]),
        email,
    )
}

/// Register the host's ACME account.
#[must_use]
pub fn register_acme_account(email: Option<&str>) -> RemoteCommand {
    acme_contact(
        RemoteCommand::new("certbot").args(["register", "--non-interactive", "--agree-tos"]),
        email,
    )
}

/// Exits 0 when the host already has an ACME account.
#[must_use]
pub fn show_acme_account() -> RemoteCommand {
    RemoteCommand::new("certbot").args(["show_account", "--non-interactive"])
}

fn acme_contact(command: RemoteCommand, email: Option<&str>) -> RemoteCommand {
    match email {
        Some(email) => command.args(["-m", email]),
        None => command.arg("--register-unsafely-without-email"),
    }
}
