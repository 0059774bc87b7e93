//! Per-host audit orchestration.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info};

use depwatch_common::Error;
use depwatch_model::Project;

use crate::config::{Config, Target};
use crate::executor::Executor;
use crate::host::Host;
use crate::locator::{build_search_command, filter_candidates, MANIFEST_NAMES};
use crate::merge::merge_projects;
use crate::parser::{freeze, read_manifest};
use crate::reporter::Reporter;
use crate::resolver::VersionChecker;

/// Pipeline stage a host audit can fail in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPhase {
    Connecting,
    Discovering,
    Parsing,
    Merging,
    Resolving,
    Reporting,
}

impl fmt::Display for AuditPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditPhase::Connecting => "connecting",
            AuditPhase::Discovering => "discovering",
            AuditPhase::Parsing => "parsing",
            AuditPhase::Merging => "merging",
            AuditPhase::Resolving => "resolving",
            AuditPhase::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// What one host's audit came to. A failure names the phase it
/// happened in; it never affects sibling hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostOutcome {
    Completed { projects: usize },
    Failed { phase: AuditPhase, error: String },
}

impl HostOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, HostOutcome::Failed { .. })
    }
}

type PhaseResult<T> = std::result::Result<T, (AuditPhase, Error)>;

/// Audit one target end to end: connect, then run the pipeline.
pub async fn audit_host(
    config: &Config,
    target: &Target,
    checker: &VersionChecker,
    reporter: &Reporter,
) -> HostOutcome {
    info!("[{}] Starting library check...", target.name);

    let host = match Host::connect(config, target).await {
        Ok(host) => host,
        Err(e) => return fail(target, AuditPhase::Connecting, e),
    };
    if !host.is_connected() {
        let e = Error::SshConnection(format!("{}: connection lost", target.host));
        return fail(target, AuditPhase::Connecting, e);
    }
    info!("[{}] Connected. Gathering dependency manifests.", target.name);

    audit_connected(target, host.executor(), checker, reporter).await
}

/// Run the discovery, parsing, merging, resolving and reporting
/// phases over an established connection.
pub async fn audit_connected(
    target: &Target,
    executor: &dyn Executor,
    checker: &VersionChecker,
    reporter: &Reporter,
) -> HostOutcome {
    match run_pipeline(target, executor, checker, reporter).await {
        Ok(projects) => {
            info!(
                "[{}] Audit complete, {} project reports written",
                target.name, projects
            );
            HostOutcome::Completed { projects }
        }
        Err((phase, error)) => fail(target, phase, error),
    }
}

fn fail(target: &Target, phase: AuditPhase, error: Error) -> HostOutcome {
    error!("[{}] Failed while {}: {}", target.name, phase, error);
    HostOutcome::Failed {
        phase,
        error: error.to_string(),
    }
}

async fn run_pipeline(
    target: &Target,
    executor: &dyn Executor,
    checker: &VersionChecker,
    reporter: &Reporter,
) -> PhaseResult<usize> {
    let command = build_search_command(MANIFEST_NAMES, &target.ignore_paths);
    info!("[{}] Running command `{}`", target.name, command);
    let output = executor
        .execute(&command)
        .await
        .map_err(|e| (AuditPhase::Discovering, e))?;
    let candidates = filter_candidates(&output.stdout_text());
    info!(
        "[{}] Search finished, {} manifest candidates",
        target.name,
        candidates.len()
    );

    let mut projects = Vec::new();
    for path in &candidates {
        let dependencies = if path.ends_with("pip") {
            debug!("[{}] Running freeze for {}", target.name, path);
            freeze(path, executor).await
        } else {
            debug!("[{}] Reading manifest {}", target.name, path);
            read_manifest(path, executor).await
        }
        .map_err(|e| (AuditPhase::Parsing, e))?;
        projects.push(Project::new(dependencies, target.name.clone(), path.clone()));
    }

    let merged = merge_projects(projects);
    info!(
        "[{}] {} projects after merge. Checking versions...",
        target.name,
        merged.len()
    );

    reporter
        .prepare_host_dir(&target.name)
        .await
        .map_err(|e| (AuditPhase::Reporting, e))?;

    for project in &merged {
        info!("[{}][{}] Checking versions...", target.name, project.name());
        let outcomes = checker.check_all(&project.dependencies).await;
        info!(
            "[{}][{}] Versions checked. Writing report.",
            target.name,
            project.name()
        );
        reporter
            .write_report(project, &outcomes)
            .await
            .map_err(|e| (AuditPhase::Reporting, e))?;
    }

    Ok(merged.len())
}
