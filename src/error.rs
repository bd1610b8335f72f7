//! Run-level error types for the audit CLI.
//!
//! Failures inside a single package's verification never surface here; they
//! are collapsed into that package's status by the pipeline. These variants
//! cover what can stop a whole run: unreadable configuration, an unreadable
//! audit root, a worker pool that cannot start, or a report that cannot be
//! written.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort an audit run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The configuration file could not be read.
    #[error("cannot read configuration at {path}")]
    ConfigRead {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::AuditConfig`].
    #[error("invalid configuration at {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The audit root does not exist or is not a directory.
    #[error("audit root {path} is not a directory")]
    RootNotFound {
        /// The rejected root path.
        path: Utf8PathBuf,
    },

    /// Walking the audit root for descriptors failed.
    #[error("package discovery failed: {reason}")]
    DiscoveryFailed {
        /// Description of the walk failure.
        reason: String,
    },

    /// The worker pool could not be created.
    #[error("cannot start {jobs} verification workers: {reason}")]
    WorkerPool {
        /// Requested worker count.
        jobs: usize,
        /// Description of the pool failure.
        reason: String,
    },

    /// Failed to write the report.
    #[error("failed to write report")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using [`AuditError`].
pub type Result<T> = std::result::Result<T, AuditError>;
