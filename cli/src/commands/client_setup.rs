//! `latent client-setup`: interactively write the host configuration.

use std::process::ExitCode;

use anyhow::Result;
use dialoguer::{Input, Password};

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::domain::HostConfig;
use crate::domain::config::DEFAULT_SSH_PORT;

/// Run `latent client-setup`.
///
/// Existing values are offered as defaults.
///
/// # Errors
///
/// Returns an error if the prompts fail (e.g. no TTY) or the file cannot be
/// written.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let store = &app.config_store;
    let current = store.load().ok();

    let mut host = Input::<String>::new().with_prompt("Host (name or IP address)");
    if let Some(c) = &current {
        host = host.default(c.host.clone());
    }
    let host = host.interact_text()?;

    let port = Input::<u16>::new()
        .with_prompt("SSH port")
        .default(current.as_ref().map_or(DEFAULT_SSH_PORT, |c| c.port))
        .interact_text()?;

    let mut username = Input::<String>::new().with_prompt("Username");
    if let Some(c) = &current {
        username = username.default(c.username.clone());
    }
    let username = username.interact_text()?;

    let password = Password::new()
        .with_prompt("Password (leave empty to use your SSH key)")
        .allow_empty_password(true)
        .interact()?;

    let email = Input::<String>::new()
        .with_prompt("Email for Let's Encrypt (leave empty to register without one)")
        .default(
            current
                .as_ref()
                .and_then(HostConfig::acme_email)
                .unwrap_or_default()
                .to_string(),
        )
        .allow_empty(true)
        .interact_text()?;

    let config = HostConfig {
        host,
        username,
        password,
        port,
        email: Some(email.trim().to_string()).filter(|e| !e.is_empty()),
    };
    store.save(&config)?;
    app.output
        .success(&format!("Saved host configuration to {}", store.path()?.display()));
    Ok(ExitCode::SUCCESS)
}
