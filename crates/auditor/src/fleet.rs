//! Fleet-wide cycle orchestration and scheduling.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use uuid::Uuid;

use depwatch_common::{Error, Result};

use crate::audit::{audit_host, HostOutcome};
use crate::config::{Config, Target};
use crate::registry::{PyPiRegistry, Registry};
use crate::reporter::Reporter;
use crate::resolver::{VersionCache, VersionChecker};

/// Outcome of one host within a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    #[serde(flatten)]
    pub outcome: HostOutcome,
}

/// One fleet-wide audit cycle.
#[derive(Debug, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub hosts: Vec<HostReport>,
}

impl CycleSummary {
    pub fn failed_hosts(&self) -> usize {
        self.hosts.iter().filter(|h| h.outcome.is_failed()).count()
    }

    pub fn succeeded_hosts(&self) -> usize {
        self.hosts.len() - self.failed_hosts()
    }

    pub fn all_failed(&self) -> bool {
        !self.hosts.is_empty() && self.failed_hosts() == self.hosts.len()
    }
}

/// Owns the shared pieces of an audit: configuration, the registry
/// client, the version cache and the report writer.
pub struct Fleet {
    config: Arc<Config>,
    registry: Arc<dyn Registry>,
    cache: Arc<VersionCache>,
    reporter: Arc<Reporter>,
}

impl Fleet {
    pub fn new(config: Config) -> Result<Self> {
        let timezone = config.timezone()?;
        let registry: Arc<dyn Registry> = Arc::new(PyPiRegistry::new(
            &config.registry.url,
            Duration::from_secs(config.registry.request_timeout_secs),
        )?);
        Ok(Self {
            registry,
            cache: Arc::new(VersionCache::new()),
            reporter: Arc::new(Reporter::new(config.log.directory.clone(), timezone)),
            config: Arc::new(config),
        })
    }

    /// Audit every configured target once.
    pub async fn run_cycle(&self) -> CycleSummary {
        let targets = self.config.sources.targets.clone();
        self.run_targets(targets).await
    }

    /// Audit a single target by name.
    pub async fn run_cycle_for(&self, host: &str) -> Result<CycleSummary> {
        let selected: Vec<Target> = self
            .config
            .sources
            .targets
            .iter()
            .filter(|target| target.name == host)
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(Error::UnknownHost(host.to_string()));
        }
        Ok(self.run_targets(selected).await)
    }

    async fn run_targets(&self, targets: Vec<Target>) -> CycleSummary {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("[cycle {}] Auditing {} targets", cycle_id, targets.len());

        // Fresh registry state once per cycle.
        self.cache.clear();

        let mut tasks = JoinSet::new();
        for target in targets {
            let config = self.config.clone();
            let checker = VersionChecker::new(self.registry.clone(), self.cache.clone());
            let reporter = self.reporter.clone();
            tasks.spawn(async move {
                let outcome = audit_host(&config, &target, &checker, &reporter).await;
                HostReport {
                    host: target.name,
                    outcome,
                }
            });
        }

        let mut hosts = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => hosts.push(report),
                Err(e) => error!("Audit task panicked: {}", e),
            }
        }
        hosts.sort_by(|a, b| a.host.cmp(&b.host));

        let summary = CycleSummary {
            cycle_id,
            started_at,
            completed_at: Utc::now(),
            hosts,
        };
        info!(
            "[cycle {}] Finished: {}/{} hosts succeeded, {} distinct packages resolved",
            cycle_id,
            summary.succeeded_hosts(),
            summary.hosts.len(),
            self.cache.len()
        );
        summary
    }

    /// Run cycles forever at the configured cadence. The first cycle
    /// starts immediately; a cycle still running when its next tick
    /// comes due delays that tick, so cycles never overlap.
    pub async fn run_scheduled(&self) {
        let mut ticker = tokio::time::interval(self.config.check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditPhase;

    fn fleet() -> Fleet {
        let config: Config = toml::from_str(
            r#"
            [sources]
            [[sources.targets]]
            name = "here"
            host = "self"
        "#,
        )
        .unwrap();
        Fleet::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_host_is_rejected() {
        let err = fleet().run_cycle_for("nope").await.unwrap_err();
        assert!(matches!(err, Error::UnknownHost(_)));
    }

    #[test]
    fn test_summary_counts() {
        let summary = CycleSummary {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            hosts: vec![
                HostReport {
                    host: "a".to_string(),
                    outcome: HostOutcome::Completed { projects: 2 },
                },
                HostReport {
                    host: "b".to_string(),
                    outcome: HostOutcome::Failed {
                        phase: AuditPhase::Connecting,
                        error: "unreachable".to_string(),
                    },
                },
            ],
        };
        assert_eq!(summary.succeeded_hosts(), 1);
        assert_eq!(summary.failed_hosts(), 1);
        assert!(!summary.all_failed());
    }

    #[test]
    fn test_summary_serializes_with_flattened_outcome() {
        let summary = CycleSummary {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            hosts: vec![HostReport {
                host: "a".to_string(),
                outcome: HostOutcome::Failed {
                    phase: AuditPhase::Discovering,
                    error: "boom".to_string(),
                },
            }],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["hosts"][0]["host"], "a");
        assert_eq!(json["hosts"][0]["status"], "failed");
        assert_eq!(json["hosts"][0]["phase"], "discovering");
    }
}
