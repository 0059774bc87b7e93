//! Common error types for depwatch.

use thiserror::Error;

/// Common error type for depwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown target host: {0}")]
    UnknownHost(String),

    #[error("No usable credential for key '{0}' (needs key_file or password)")]
    MissingCredential(String),

    #[error("SSH connection failed: {0}")]
    SshConnection(String),

    #[error("SSH authentication failed: {0}")]
    SshAuth(String),

    #[error("Command execution failed: {cmd} - {reason}")]
    CommandExecution { cmd: String, reason: String },

    #[error("Command timed out: {cmd}")]
    CommandTimeout { cmd: String },

    #[error("Registry request failed: {0}")]
    Registry(String),

    #[error("Package not found in registry: {0}")]
    PackageNotFound(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid constraint operator: {0}")]
    InvalidConstraint(String),

    #[error("Report write failed: {0}")]
    Report(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
