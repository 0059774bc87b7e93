//! TOML configuration for the auditor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use depwatch_common::{Error, Result};

/// Target host value that selects the local subprocess executor
/// instead of an SSH connection.
pub const LOCAL_TARGET: &str = "self";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sources: Sources,
    #[serde(default)]
    pub keys: HashMap<String, Key>,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sources {
    /// Minutes between scheduled audit cycles.
    #[serde(default = "default_interval_minutes")]
    pub check_interval_minutes: u64,
    /// Key used by targets that do not name their own.
    pub default_key: Option<String>,
    /// Upper bound for one remote or local command.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Display name, also the per-host report directory.
    pub name: String,
    /// SSH destination, or `"self"` for the local machine.
    pub host: String,
    #[serde(default = "default_user")]
    pub user: String,
    pub key: Option<String>,
    /// Subtrees pruned from manifest discovery on this host.
    #[serde(default)]
    pub ignore_paths: Vec<String>,
}

impl Target {
    pub fn is_local(&self) -> bool {
        self.host == LOCAL_TARGET
    }
}

/// Credential material referenced by name from targets.
#[derive(Debug, Clone, Deserialize)]
pub struct Key {
    pub key_file: Option<PathBuf>,
    pub passphrase: Option<String>,
    pub password: Option<String>,
}

impl Key {
    pub fn has_credential(&self) -> bool {
        self.key_file.is_some() || self.password.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
    pub request_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "https://pypi.org".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// IANA timezone used for report dates.
    pub timezone: String,
    /// Root of the report tree.
    pub directory: PathBuf,
    /// Optional second tracing sink.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            directory: PathBuf::from("log"),
            file: None,
        }
    }
}

fn default_interval_minutes() -> u64 {
    1440
}

fn default_command_timeout_secs() -> u64 {
    300
}

fn default_user() -> String {
    "root".to_string()
}

impl Config {
    /// Read and validate a configuration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would fail mid-cycle: missing
    /// targets, unresolvable keys, credentials without material and
    /// unknown timezones all surface at startup instead.
    pub fn validate(&self) -> Result<()> {
        if self.sources.targets.is_empty() {
            return Err(Error::Config("no targets configured".to_string()));
        }
        if self.sources.check_interval_minutes == 0 {
            return Err(Error::Config(
                "check_interval_minutes must be at least 1".to_string(),
            ));
        }
        for target in &self.sources.targets {
            if target.is_local() {
                continue;
            }
            let (name, key) = self.key_for(target)?;
            if !key.has_credential() {
                return Err(Error::MissingCredential(name.to_string()));
            }
        }
        self.timezone()?;
        Ok(())
    }

    /// Resolve the credential a target connects with.
    pub fn key_for<'a>(&'a self, target: &'a Target) -> Result<(&'a str, &'a Key)> {
        let name = target
            .key
            .as_deref()
            .or(self.sources.default_key.as_deref())
            .ok_or_else(|| {
                Error::Config(format!(
                    "target '{}' names no key and no default_key is set",
                    target.name
                ))
            })?;
        let key = self
            .keys
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown key '{name}' for target '{}'", target.name)))?;
        Ok((name, key))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.log
            .timezone
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("invalid timezone '{}': {e}", self.log.timezone)))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.command_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.sources.check_interval_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [sources]
        check_interval_minutes = 60
        default_key = "main"

        [[sources.targets]]
        name = "web-01"
        host = "203.0.113.7"
        user = "audit"
        ignore_paths = ["/proc", "/sys"]

        [[sources.targets]]
        name = "local"
        host = "self"

        [keys.main]
        key_file = "/etc/depwatch/id_ed25519"

        [log]
        timezone = "Europe/Paris"
    "#;

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sources.targets.len(), 2);
        assert_eq!(config.sources.targets[0].user, "audit");
        assert_eq!(config.sources.targets[1].user, "root");
        assert!(config.sources.targets[1].is_local());
        assert_eq!(config.registry.url, "https://pypi.org");
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Paris);
    }

    #[test]
    fn test_key_resolution_falls_back_to_default() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let (name, key) = config.key_for(&config.sources.targets[0]).unwrap();
        assert_eq!(name, "main");
        assert!(key.has_credential());
    }

    #[test]
    fn test_rejects_empty_targets() {
        let config: Config = toml::from_str("[sources]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_key() {
        let toml_text = r#"
            [sources]
            [[sources.targets]]
            name = "a"
            host = "b"
            key = "missing"
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_rejects_key_without_credential() {
        let toml_text = r#"
            [sources]
            default_key = "empty"
            [[sources.targets]]
            name = "a"
            host = "b"
            [keys.empty]
            passphrase = "only"
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            Error::MissingCredential(_)
        ));
    }

    #[test]
    fn test_rejects_bad_timezone() {
        let toml_text = r#"
            [sources]
            [[sources.targets]]
            name = "local"
            host = "self"
            [log]
            timezone = "Mars/Olympus"
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.sources.check_interval_minutes, 60);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/depwatch.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
