//! Application service: the `latent init` provisioning pipeline.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! Steps run strictly in order. Every remote step is idempotent, and progress
//! is checkpointed locally after each step so an interrupted run can be resumed
//! with the same project ID.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use crate::application::ports::{
    PortCandidates, ProgressReporter, ProjectDir, ProjectStore, RemoteConnector, RemoteShell,
};
use crate::application::services::port_registry::PortRegistry;
use crate::application::services::remote::{run_checked, stream_checked, write_file};
use crate::domain::project::{
    DEPLOY_REMOTE, ENTRY_SCRIPT, RECORD_FILE, generate_project_id, validate_domain,
};
use crate::domain::remote::{
    hook_path, issue_certificate, project_dir, route_path, unit_path,
};
use crate::domain::template::render_template;
use crate::domain::{
    ProjectError, ProjectRecord, ProvisionCheckpoint, ProvisionStep, RemoteCommand, RetryPolicy,
    StepFailed, TemplateContext, TemplateName,
};

/// Caller-supplied settings for one provisioning run.
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions<'a> {
    /// Hostname to bind. Ignored when resuming; the checkpoint's domain wins.
    pub domain: Option<&'a str>,
    /// Continue the run recorded in the local checkpoint.
    pub resume: bool,
    /// Contact address for the ACME account certbot registers on first use.
    pub acme_email: Option<&'a str>,
    /// Retry schedule for port allocation.
    pub retry: RetryPolicy,
}

/// Result of a completed provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub record: ProjectRecord,
    pub port: u16,
}

/// Provision the current project on the configured host.
///
/// Local preconditions are checked before any connection is opened. Each
/// failure is reported as the step that raised it, with the cause attached.
///
/// # Errors
///
/// Returns the first failing step's error wrapped in [`StepFailed`].
pub async fn provision(
    connector: &impl RemoteConnector,
    store: &impl ProjectStore,
    project: &impl ProjectDir,
    candidates: &impl PortCandidates,
    reporter: &impl ProgressReporter,
    opts: ProvisionOptions<'_>,
) -> Result<ProvisionOutcome> {
    let step = ProvisionStep::Validate;
    reporter.step(&step.to_string());
    let resumed = validate(store, project, &opts)
        .await
        .with_context(|| StepFailed { step })?;

    let step = ProvisionStep::GenerateId;
    let mut checkpoint = match resumed {
        Some(checkpoint) => {
            reporter.success(&format!(
                "resuming project {} after step {}",
                checkpoint.id, checkpoint.completed
            ));
            checkpoint
        }
        None => {
            reporter.step(&step.to_string());
            let checkpoint = ProvisionCheckpoint {
                id: generate_project_id(),
                domain: opts.domain.map(str::to_owned),
                completed: step.number(),
                port: None,
                started_at: Utc::now(),
            };
            store
                .save_checkpoint(&checkpoint)
                .await
                .with_context(|| StepFailed { step })?;
            tracing::info!(id = %checkpoint.id, "generated project id");
            checkpoint
        }
    };

    let step = ProvisionStep::Connect;
    reporter.step(&step.to_string());
    let shell = connector.connect().await.with_context(|| StepFailed { step })?;
    advance(store, &mut checkpoint, step).await?;

    let remote_steps = ProvisionStep::ALL
        .into_iter()
        .filter(|step| *step > ProvisionStep::Connect && *step < ProvisionStep::LinkLocalRecord);
    for step in remote_steps {
        if !step.pending_after(checkpoint.completed) {
            tracing::debug!(%step, "already completed");
            continue;
        }
        reporter.step(&step.to_string());
        run_step(step, &shell, &mut checkpoint, candidates, reporter, &opts)
            .await
            .with_context(|| StepFailed { step })?;
        advance(store, &mut checkpoint, step).await?;
    }

    let step = ProvisionStep::LinkLocalRecord;
    reporter.step(&step.to_string());
    let record = ProjectRecord {
        id: checkpoint.id.clone(),
        domain: checkpoint.domain.clone(),
    };
    link(&shell, store, project, &record)
        .await
        .with_context(|| StepFailed { step })?;
    tracing::info!(%step, id = %record.id, "step completed");

    let port = checkpoint
        .port
        .ok_or_else(|| anyhow!("no port was reserved for project {}", record.id))?;
    Ok(ProvisionOutcome { record, port })
}

/// Step 1. Returns the checkpoint to continue from when resuming.
async fn validate(
    store: &impl ProjectStore,
    project: &impl ProjectDir,
    opts: &ProvisionOptions<'_>,
) -> Result<Option<ProvisionCheckpoint>> {
    let root = store.project_root();
    if store.load_record().await?.is_some() {
        return Err(ProjectError::AlreadyProvisioned {
            record: root.join(RECORD_FILE).display().to_string(),
        }
        .into());
    }
    if !project.has_entry_point() {
        return Err(ProjectError::MissingEntryPoint {
            entry: ENTRY_SCRIPT.to_string(),
            dir: root.display().to_string(),
        }
        .into());
    }

    let checkpoint = store.load_checkpoint().await?;
    let resumed = match (checkpoint, opts.resume) {
        (Some(checkpoint), true) => Some(checkpoint),
        (Some(checkpoint), false) => {
            return Err(ProjectError::InterruptedProvisioning { id: checkpoint.id }.into());
        }
        (None, true) => return Err(ProjectError::NothingToResume.into()),
        (None, false) => None,
    };

    let domain = match &resumed {
        Some(checkpoint) => checkpoint.domain.as_deref(),
        None => opts.domain,
    };
    if let Some(domain) = domain {
        validate_domain(domain)?;
    }
    Ok(resumed)
}

/// Record `step` as completed and persist the checkpoint.
async fn advance(
    store: &impl ProjectStore,
    checkpoint: &mut ProvisionCheckpoint,
    step: ProvisionStep,
) -> Result<()> {
    checkpoint.completed = checkpoint.completed.max(step.number());
    store
        .save_checkpoint(checkpoint)
        .await
        .with_context(|| StepFailed { step })?;
    tracing::info!(%step, id = %checkpoint.id, "step completed");
    Ok(())
}

/// Steps 4 to 9. Step 10 touches local state and is handled by [`link`].
async fn run_step(
    step: ProvisionStep,
    shell: &impl RemoteShell,
    checkpoint: &mut ProvisionCheckpoint,
    candidates: &impl PortCandidates,
    reporter: &impl ProgressReporter,
    opts: &ProvisionOptions<'_>,
) -> Result<()> {
    let id = checkpoint.id.as_str();
    match step {
        ProvisionStep::RemoteInit => init_repository(shell, id).await,
        ProvisionStep::AllocatePort => {
            let port = PortRegistry::new(shell)
                .with_policy(opts.retry)
                .allocate(id, candidates)
                .await?;
            reporter.success(&format!("reserved port {port}"));
            checkpoint.port = Some(port);
            Ok(())
        }
        ProvisionStep::InstallUnit => {
            let ctx = service_context(checkpoint)?;
            let unit = render_template(TemplateName::Unit, &ctx)?;
            write_file(shell, &unit_path(id), &unit, "0644").await?;
            run_checked(shell, &RemoteCommand::new("systemctl").arg("daemon-reload")).await?;
            Ok(())
        }
        ProvisionStep::InstallRoute => {
            let ctx = service_context(checkpoint)?;
            let route = render_template(TemplateName::Route, &ctx)?;
            write_file(shell, &route_path(id), &route, "0644").await?;
            run_checked(shell, &RemoteCommand::new("nginx").args(["-s", "reload"])).await?;
            Ok(())
        }
        ProvisionStep::IssueCertificate => match checkpoint.domain.as_deref() {
            Some(domain) => {
                let certbot = issue_certificate(domain, opts.acme_email);
                stream_checked(shell, &certbot, &mut |line| reporter.output(line)).await
            }
            None => {
                reporter.success("no domain given, skipping certificate");
                Ok(())
            }
        },
        ProvisionStep::InstallHook => {
            let hook = render_template(TemplateName::Hook, &TemplateContext::hook(id))?;
            write_file(shell, &hook_path(id), &hook, "0755").await
        }
        ProvisionStep::Validate
        | ProvisionStep::GenerateId
        | ProvisionStep::Connect
        | ProvisionStep::LinkLocalRecord => Ok(()),
    }
}

async fn init_repository(shell: &impl RemoteShell, id: &str) -> Result<()> {
    let dir = project_dir(id);
    run_checked(shell, &RemoteCommand::new("mkdir").args(["-p", dir.as_str()])).await?;
    run_checked(
        shell,
        &RemoteCommand::new("git").args(["init", "--shared", dir.as_str()]),
    )
    .await?;
    run_checked(
        shell,
        &RemoteCommand::new("git").args([
            "-C",
            dir.as_str(),
            "config",
            "receive.denyCurrentBranch",
            "updateInstead",
        ]),
    )
    .await?;
    Ok(())
}

fn service_context(checkpoint: &ProvisionCheckpoint) -> Result<TemplateContext> {
    let port = checkpoint
        .port
        .ok_or_else(|| anyhow!("no port was reserved for project {}", checkpoint.id))?;
    Ok(TemplateContext::service(
        &checkpoint.id,
        port,
        checkpoint.domain.as_deref(),
    ))
}

/// Step 10: point the local `deploy` remote at the new repository, then mark
/// the directory as provisioned.
async fn link(
    shell: &impl RemoteShell,
    store: &impl ProjectStore,
    project: &impl ProjectDir,
    record: &ProjectRecord,
) -> Result<()> {
    let url = shell.remote_url(&project_dir(&record.id));
    project.link_remote(DEPLOY_REMOTE, &url).await?;
    store.save_record(record).await?;
    store.clear_checkpoint().await?;
    Ok(())
}
