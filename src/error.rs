//! Error types for counter sources and the sampling engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sampling operations.
pub type Result<T> = std::result::Result<T, SampleError>;

/// Errors surfaced to callers of the sampling engine.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Disk path does not exist or cannot be accessed.
    #[error("invalid path {}: {source}", path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a counter file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Counter data was readable but malformed or incomplete.
    #[error("source error: {0}")]
    Source(String),
}

/// Per-process failures during enumeration.
///
/// These are expected while walking a live process table and are skipped by
/// the engine rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// Process exited between listing and reading.
    #[error("no such process: {0}")]
    NoSuchProcess(u32),

    /// Process exists but its counters are not readable by us.
    #[error("access denied for process {0}")]
    AccessDenied(u32),

    /// Any other read or parse failure for a single process.
    #[error("process {pid}: {reason}")]
    Unreadable { pid: u32, reason: String },
}

impl ProcessError {
    /// Maps an I/O error for `/proc/<pid>/...` onto the transient taxonomy.
    pub fn from_io(pid: u32, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NoSuchProcess(pid),
            std::io::ErrorKind::PermissionDenied => ProcessError::AccessDenied(pid),
            _ => ProcessError::Unreadable {
                pid,
                reason: err.to_string(),
            },
        }
    }

    /// PID the error refers to.
    pub fn pid(&self) -> u32 {
        match self {
            ProcessError::NoSuchProcess(pid) | ProcessError::AccessDenied(pid) => *pid,
            ProcessError::Unreadable { pid, .. } => *pid,
        }
    }
}
