//! Latest-version checking against the registry, with caching.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::debug;

use depwatch_common::Result;
use depwatch_model::{CheckOutcome, Dependency, Version, LATEST_SENTINEL};

use crate::registry::Registry;

/// Latest-version cache keyed by lowercased package name. Shared by
/// every host task in a cycle; the fleet clears it once per cycle so
/// each cycle observes fresh registry state.
///
/// The lock is never held across an await. Two tasks racing on a cold
/// name may both query the registry; the second store wins and later
/// lookups are served from the cache.
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: Mutex<HashMap<String, Version>>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Version> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&cache_key(name)).cloned()
    }

    pub fn store(&self, name: &str, version: Version) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(cache_key(name), version);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    /// Number of distinct packages resolved so far this cycle.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Resolves latest versions and classifies pinned constraints.
pub struct VersionChecker {
    registry: Arc<dyn Registry>,
    cache: Arc<VersionCache>,
}

impl VersionChecker {
    pub fn new(registry: Arc<dyn Registry>, cache: Arc<VersionCache>) -> Self {
        Self { registry, cache }
    }

    /// Latest published version of a package. A cache hit answers
    /// without a registry query; `use_cache = false` always queries
    /// and refreshes the stored value.
    pub async fn resolve_latest(&self, name: &str, use_cache: bool) -> Result<Version> {
        if use_cache {
            if let Some(hit) = self.cache.get(name) {
                return Ok(hit);
            }
        }
        debug!("Getting version of {}...", name);
        let latest = self.registry.latest_version(name).await?;
        self.cache.store(name, latest.clone());
        Ok(latest)
    }

    /// Check every dependency of a project, one outcome per library.
    ///
    /// Failures stay local to their dependency; an unresolvable
    /// package never hides the other results. Unpinned sentinels
    /// always come back `Outdated`, surfacing them for review.
    pub async fn check_all(
        &self,
        dependencies: &HashSet<Dependency>,
    ) -> BTreeMap<String, CheckOutcome> {
        let mut outcomes = BTreeMap::new();
        for dependency in dependencies {
            let outcome = self.check_one(dependency).await;
            outcomes.insert(dependency.library.clone(), outcome);
        }
        outcomes
    }

    async fn check_one(&self, dependency: &Dependency) -> CheckOutcome {
        let latest = match self.resolve_latest(&dependency.library, true).await {
            Ok(version) => version,
            Err(e) => return CheckOutcome::Failed(e.to_string()),
        };
        if dependency.is_unpinned() {
            return CheckOutcome::Outdated {
                pinned: LATEST_SENTINEL.to_string(),
                latest,
            };
        }
        match dependency.specifier() {
            Ok(specifier) if specifier.matches(&latest) => CheckOutcome::UpToDate,
            Ok(_) => CheckOutcome::Outdated {
                pinned: dependency.version.clone(),
                latest,
            },
            Err(e) => CheckOutcome::Failed(e.to_string()),
        }
    }
}
