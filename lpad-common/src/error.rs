// lpad-common/src/error.rs
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LpadError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resolver not found: {0} (install pkgx or set LPAD_RESOLVER to its path)")]
    ResolverUnavailable(String),

    #[error("Resolver does not support structured output: {0}")]
    ResolverProtocolMismatch(String),

    #[error("Resolver timed out after {}ms resolving [{}]", .timeout.as_millis(), .specs.join(", "))]
    ResolverTimeout { specs: Vec<String>, timeout: Duration },

    #[error("Resolver failed: {0}")]
    ResolverFailure(String),

    #[error("Failed to resolve [{}] after {attempts} attempts: {last}", .specs.join(", "))]
    ResolverRetriesExhausted {
        specs: Vec<String>,
        attempts: u32,
        last: Box<LpadError>,
    },

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid version constraint: {0}")]
    InvalidConstraint(String),

    #[error("Filesystem Error: {0}")]
    Filesystem(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("No packages were installed ({0} failed)")]
    NoPackagesInstalled(usize),

    #[error("Lock Error: {0}")]
    Lock(String),

    #[error("Version error: {0}")]
    VersionError(String),

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl LpadError {
    /// Whether the resolver retry loop should try again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LpadError::ResolverTimeout { .. } | LpadError::ResolverFailure(_)
        )
    }
}

impl From<std::io::Error> for LpadError {
    fn from(err: std::io::Error) -> Self {
        LpadError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for LpadError {
    fn from(err: serde_json::Error) -> Self {
        LpadError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LpadError>;
