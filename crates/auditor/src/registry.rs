//! Package registry lookups.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use depwatch_common::{Error, Result};
use depwatch_model::Version;

/// Source of latest-version answers, keyed by package name.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn latest_version(&self, name: &str) -> Result<Version>;
}

#[derive(Debug, Deserialize)]
struct PackageResponse {
    info: PackageInfo,
}

#[derive(Debug, Deserialize)]
struct PackageInfo {
    version: String,
}

/// Queries the JSON metadata endpoint of a PyPI-compatible index.
pub struct PyPiRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl PyPiRegistry {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Registry(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Registry for PyPiRegistry {
    async fn latest_version(&self, name: &str) -> Result<Version> {
        let name = name.trim().to_lowercase();
        let url = format!("{}/pypi/{}/json", self.base_url, name);
        debug!("Getting version of {} from {}", name, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Registry(format!("{name}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::PackageNotFound(name));
        }
        let payload: PackageResponse = response
            .json()
            .await
            .map_err(|e| Error::Registry(format!("{name}: {e}")))?;
        Version::parse(&payload.info.version)
    }
}
