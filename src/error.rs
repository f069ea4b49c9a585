//! Error types for sensing and location management.
//!
//! Storage and startup plumbing use `anyhow`; these enums cover the cases
//! callers need to tell apart.

use std::path::PathBuf;
use std::time::Duration;

/// Reading the current network name failed. Never fatal: the monitor loop
/// backs off and retries.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    ExitStatus { command: String, status: String },

    #[error("network lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("network sensing is not supported on {0}")]
    Unsupported(String),
}

/// A location replacement was rejected. The registry keeps its prior contents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("location name must not be empty")]
    EmptyName,

    #[error("location '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("location '{0}' has no networks")]
    NoNetworks(String),

    #[error("location '{0}' lists an empty network name")]
    EmptyNetwork(String),

    #[error("malformed locations payload: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("failed to serialize locations: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write locations to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A command sent to the monitor loop could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor loop is not running")]
    NotRunning,

    /// The session was ended but could not be written; it is not retried.
    #[error("session ended but was not saved: {0}")]
    Persistence(String),
}
