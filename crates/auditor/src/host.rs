//! A configured target with its live connection.

use tracing::info;

use depwatch_common::{Error, Result};

use crate::config::{Config, Key, Target};
use crate::executor::{Executor, LocalExecutor, SshExecutor};

pub const SSH_PORT: u16 = 22;

/// One audited host for the duration of a cycle: the config entry it
/// came from, the credential it authenticated with and the executor
/// running its commands.
pub struct Host {
    pub name: String,
    pub target: Target,
    pub key: Option<Key>,
    connection: Box<dyn Executor>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Establish the connection a cycle runs over. Targets pointing at
    /// the local machine get a subprocess executor and need no
    /// credential; everything else connects over SSH with the key
    /// resolved from configuration.
    pub async fn connect(config: &Config, target: &Target) -> Result<Host> {
        let timeout = config.command_timeout();

        if target.is_local() {
            info!("[{}] Using local executor", target.name);
            return Ok(Host {
                name: target.name.clone(),
                target: target.clone(),
                key: None,
                connection: Box::new(LocalExecutor::new(timeout)),
            });
        }

        let (key_name, key) = config.key_for(target)?;
        if !key.has_credential() {
            return Err(Error::MissingCredential(key_name.to_string()));
        }
        let executor = SshExecutor::connect(
            &target.host,
            SSH_PORT,
            &target.user,
            key.key_file.as_deref(),
            key.passphrase.as_deref(),
            key.password.as_deref(),
            timeout,
        )?;
        info!(
            "[{}] Connected to {} as {} with key '{}'",
            target.name, target.host, target.user, key_name
        );
        Ok(Host {
            name: target.name.clone(),
            target: target.clone(),
            key: Some(key.clone()),
            connection: Box::new(executor),
        })
    }

    pub fn executor(&self) -> &dyn Executor {
        self.connection.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> Config {
        toml::from_str(
            r#"
            [sources]
            [[sources.targets]]
            name = "here"
            host = "self"
        "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_local_target_needs_no_credential() {
        let config = local_config();
        let host = Host::connect(&config, &config.sources.targets[0])
            .await
            .unwrap();
        assert!(host.key.is_none());
        assert!(host.is_connected());
        let output = host.executor().execute("echo ready").await.unwrap();
        assert!(output.stdout_text().contains("ready"));
    }

    #[tokio::test]
    async fn test_remote_target_without_key_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [sources]
            [[sources.targets]]
            name = "web-01"
            host = "203.0.113.7"
        "#,
        )
        .unwrap();
        let err = Host::connect(&config, &config.sources.targets[0])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
