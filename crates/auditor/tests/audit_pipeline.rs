//! Drives the audit pipeline end to end with a scripted host and a
//! stubbed registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use depwatch_auditor::audit::{audit_connected, HostOutcome};
use depwatch_auditor::config::Target;
use depwatch_auditor::executor::{CommandOutput, Executor};
use depwatch_auditor::locator::{build_search_command, shell_quote, MANIFEST_NAMES};
use depwatch_auditor::registry::Registry;
use depwatch_auditor::reporter::Reporter;
use depwatch_auditor::resolver::{VersionCache, VersionChecker};
use depwatch_common::{Error, Result};
use depwatch_model::Version;

struct ScriptedExecutor {
    responses: HashMap<String, String>,
}

impl ScriptedExecutor {
    fn new(responses: &[(String, &str)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(command, stdout)| (command.clone(), stdout.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        match self.responses.get(command) {
            Some(stdout) => Ok(CommandOutput {
                exit_code: Some(0),
                stdout: stdout.clone().into_bytes(),
                stderr: Vec::new(),
            }),
            None => Err(Error::CommandExecution {
                cmd: command.to_string(),
                reason: "unexpected command".to_string(),
            }),
        }
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct StubRegistry {
    versions: HashMap<String, String>,
}

impl StubRegistry {
    fn new(versions: &[(&str, &str)]) -> Self {
        Self {
            versions: versions
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl Registry for StubRegistry {
    async fn latest_version(&self, name: &str) -> Result<Version> {
        match self.versions.get(&name.to_lowercase()) {
            Some(version) => Version::parse(version),
            None => Err(Error::PackageNotFound(name.to_string())),
        }
    }
}

fn target() -> Target {
    Target {
        name: "web-01".to_string(),
        host: "203.0.113.7".to_string(),
        user: "root".to_string(),
        key: None,
        ignore_paths: Vec::new(),
    }
}

fn checker(registry: StubRegistry) -> VersionChecker {
    VersionChecker::new(Arc::new(registry), Arc::new(VersionCache::new()))
}

#[tokio::test]
async fn test_unpinned_and_outdated_dependencies_land_in_the_report() {
    let tmp = tempfile::tempdir().unwrap();
    let search = build_search_command(MANIFEST_NAMES, &[]);
    let executor = ScriptedExecutor::new(&[
        (search, "/srv/shop/requirements.txt\n"),
        (
            format!("cat {}", shell_quote("/srv/shop/requirements.txt")),
            "requests==2.0\nflask\n",
        ),
    ]);
    let checker = checker(StubRegistry::new(&[
        ("requests", "2.31.0"),
        ("flask", "3.0.0"),
    ]));
    let reporter = Reporter::new(tmp.path().to_path_buf(), chrono_tz::UTC);

    let outcome = audit_connected(&target(), &executor, &checker, &reporter).await;
    assert_eq!(outcome, HostOutcome::Completed { projects: 1 });

    let report = std::fs::read_to_string(tmp.path().join("web_01").join("shop.txt")).unwrap();
    assert!(report.starts_with("web_01/shop | "));
    assert_eq!(report.lines().nth(1), Some("/srv/shop/requirements.txt"));
    assert!(report.contains("requests: Has: 2.0 Latest: 2.31.0"));
    assert!(report.contains("flask: Has: latest Latest: 3.0.0"));
    assert!(report.ends_with("Up to Date Libraries:\n"));
}

#[tokio::test]
async fn test_venv_discovered_twice_produces_one_merged_report() {
    let tmp = tempfile::tempdir().unwrap();
    let search = build_search_command(MANIFEST_NAMES, &[]);
    let executor = ScriptedExecutor::new(&[
        (
            search,
            "/srv/shop/requirements.txt\n/srv/shop/venv/bin/pip\n",
        ),
        (
            format!("cat {}", shell_quote("/srv/shop/requirements.txt")),
            "flask==2.9\nrequests>=2.0\n",
        ),
        (
            format!("{} freeze", shell_quote("/srv/shop/venv/bin/pip")),
            "flask==2.9\njinja2==3.1.3\n",
        ),
    ]);
    let checker = checker(StubRegistry::new(&[
        ("flask", "3.0.0"),
        ("requests", "2.31.0"),
        ("jinja2", "3.1.3"),
    ]));
    let reporter = Reporter::new(tmp.path().to_path_buf(), chrono_tz::UTC);

    let outcome = audit_connected(&target(), &executor, &checker, &reporter).await;
    assert_eq!(outcome, HostOutcome::Completed { projects: 1 });

    let report = std::fs::read_to_string(tmp.path().join("web_01").join("shop.txt")).unwrap();
    assert!(report.contains("flask: Has: 2.9 Latest: 3.0.0"));

    let (outdated, up_to_date) = report.split_once("Up to Date Libraries:").unwrap();
    assert!(!outdated.contains("requests:"));
    assert!(up_to_date.contains("jinja2"));
    assert!(up_to_date.contains("requests"));
}

#[tokio::test]
async fn test_registry_miss_fails_only_that_dependency() {
    let tmp = tempfile::tempdir().unwrap();
    let search = build_search_command(MANIFEST_NAMES, &[]);
    let executor = ScriptedExecutor::new(&[
        (search, "/srv/etl/requirements.txt\n"),
        (
            format!("cat {}", shell_quote("/srv/etl/requirements.txt")),
            "alpha>=1.0\ninternal-tool==0.3\n",
        ),
    ]);
    let checker = checker(StubRegistry::new(&[("alpha", "2.0")]));
    let reporter = Reporter::new(tmp.path().to_path_buf(), chrono_tz::UTC);

    let outcome = audit_connected(&target(), &executor, &checker, &reporter).await;
    assert_eq!(outcome, HostOutcome::Completed { projects: 1 });

    let report = std::fs::read_to_string(tmp.path().join("web_01").join("etl.txt")).unwrap();
    let (outdated, up_to_date) = report.split_once("Up to Date Libraries:").unwrap();
    assert!(outdated.contains("internal-tool:"));
    assert!(up_to_date.contains("alpha"));
}
