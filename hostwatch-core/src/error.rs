use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain the output of an external command.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` produced output that is not valid UTF-8")]
    Decode {
        command: String,
        #[source]
        source: FromUtf8Error,
    },
}

/// A snapshot or whitelist file could not be read or written.
#[derive(Debug, Error)]
#[error("failed to {action} {}: {source}", path.display())]
pub struct StoreError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl StoreError {
    pub(crate) fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A resource sampler could not produce a reading.
#[derive(Debug, Error)]
#[error("{resource} usage unavailable: {reason}")]
pub struct ReadError {
    pub resource: &'static str,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Anything that can abort a single monitoring cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Read(#[from] ReadError),
}
