//! Command executors for the supported connection types.

use std::borrow::Cow;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use ssh2::Session;
use tokio::process::Command;
use tracing::debug;

use depwatch_common::{Error, Result};

/// Captured output of one remote or local command. Output is kept as
/// raw bytes; discovered paths are not guaranteed to be valid UTF-8.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Trait for command execution against one host.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a shell command and capture its output.
    async fn execute(&self, command: &str) -> Result<CommandOutput>;

    /// Check if the connection is still alive.
    fn is_connected(&self) -> bool;
}

/// Runs commands on the auditor's own machine. Used for targets that
/// name the local host instead of an SSH destination.
pub struct LocalExecutor {
    timeout: Duration,
}

impl LocalExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        debug!("Local exec: {}", command);

        let child = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", command]).output()
        } else {
            Command::new("sh").args(["-c", command]).output()
        };

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| Error::CommandTimeout {
                cmd: command.to_string(),
            })?
            .map_err(|e| Error::CommandExecution {
                cmd: command.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// SSH executor for remote Linux systems.
pub struct SshExecutor {
    session: Session,
}

impl SshExecutor {
    /// Connect and authenticate to a remote host.
    ///
    /// Tries key-based auth when a key file is given, password auth
    /// otherwise. The timeout covers the TCP connect, the handshake
    /// and every later channel operation.
    pub fn connect(
        host: &str,
        port: u16,
        user: &str,
        key_file: Option<&Path>,
        passphrase: Option<&str>,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::SshConnection(format!("{host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| Error::SshConnection(format!("{host}:{port}: no address found")))?;
        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| Error::SshConnection(format!("{host}:{port}: {e}")))?;

        let mut session =
            Session::new().map_err(|e| Error::SshConnection(format!("{host}: {e}")))?;
        session.set_timeout(timeout.as_millis() as u32);
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| Error::SshConnection(format!("{host}: handshake failed: {e}")))?;

        if let Some(key) = key_file {
            session
                .userauth_pubkey_file(user, None, key, passphrase)
                .map_err(|e| Error::SshAuth(format!("{host}: key auth failed: {e}")))?;
        } else if let Some(pwd) = password {
            session
                .userauth_password(user, pwd)
                .map_err(|e| Error::SshAuth(format!("{host}: password auth failed: {e}")))?;
        } else {
            return Err(Error::SshAuth(format!("{host}: no credential supplied")));
        }

        if !session.authenticated() {
            return Err(Error::SshAuth(format!("{host}: authentication rejected")));
        }

        Ok(Self { session })
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        debug!("SSH exec: {}", command);

        let exec_err = |reason: String| Error::CommandExecution {
            cmd: command.to_string(),
            reason,
        };

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| exec_err(format!("failed to open channel: {e}")))?;
        channel
            .exec(command)
            .map_err(|e| exec_err(format!("exec failed: {e}")))?;

        let mut stdout = Vec::new();
        channel
            .read_to_end(&mut stdout)
            .map_err(|e| exec_err(format!("failed to read stdout: {e}")))?;

        let mut stderr = Vec::new();
        channel
            .stderr()
            .read_to_end(&mut stderr)
            .map_err(|e| exec_err(format!("failed to read stderr: {e}")))?;

        channel.wait_close().ok();
        let exit_code = channel.exit_status().ok();

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    fn is_connected(&self) -> bool {
        self.session.authenticated()
    }
}
