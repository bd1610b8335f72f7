//! Patch discovery and replay.
//!
//! Known local modifications are recorded as unified diffs, either vendored
//! next to the package or listed in a drush make `PATCHES.txt` manifest.
//! Before comparison they are replayed onto the pristine release so that
//! documented changes do not count as tampering.
//!
//! # Sub-modules
//!
//! - [`collect`] - Patch discovery from the manifest and the package tree.
//! - [`apply`] - Best-effort application through an external patch tool.

pub mod apply;
pub mod collect;

use std::fmt;
use std::path::PathBuf;

use crate::fetch::download::DownloadError;

/// Where a patch file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOrigin {
    /// Vendored inside the package directory.
    Local,
    /// Listed in the patch manifest and downloaded for this run.
    Remote {
        /// URL the patch was downloaded from.
        url: String,
    },
}

/// A patch file ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    /// Absolute path of the patch on disk.
    pub path: PathBuf,
    /// Where the patch came from.
    pub origin: PatchOrigin,
}

/// Result of replaying one patch onto the pristine copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The tool reported success.
    Applied,
    /// The tool ran but did not apply the patch cleanly.
    Rejected {
        /// Exit code, if the tool exited normally.
        code: Option<i32>,
        /// First line of the tool's diagnostics.
        detail: String,
    },
    /// The tool could not be run at all.
    ToolUnavailable {
        /// Why the tool could not be run.
        detail: String,
    },
}

impl ApplyOutcome {
    /// Whether the patch applied cleanly.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Rejected { code: Some(code), detail } if !detail.is_empty() => {
                write!(f, "failed (exit {code}: {detail})")
            }
            Self::Rejected { code: Some(code), .. } => write!(f, "failed (exit {code})"),
            Self::Rejected { code: None, .. } => f.write_str("failed (terminated)"),
            Self::ToolUnavailable { detail } => write!(f, "not applied ({detail})"),
        }
    }
}

/// A patch together with the outcome of replaying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    /// The patch that was replayed.
    pub patch: PatchFile,
    /// What happened when it was replayed.
    pub outcome: ApplyOutcome,
}

/// Errors arising while collecting patches.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The patch manifest exists but could not be read.
    #[error("cannot read patch manifest: {0}")]
    Manifest(#[source] std::io::Error),

    /// A manifest-referenced patch could not be downloaded.
    #[error("cannot fetch patch {url}: {source}")]
    Download {
        /// URL listed in the manifest.
        url: String,
        /// The underlying download error.
        #[source]
        source: DownloadError,
    },

    /// Walking the package tree for vendored patches failed.
    #[error("cannot scan for patches: {0}")]
    Scan(#[from] walkdir::Error),

    /// A vendored patch path could not be made absolute.
    #[error("cannot resolve patch path: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::applied(ApplyOutcome::Applied, "applied")]
    #[case::rejected(
        ApplyOutcome::Rejected { code: Some(1), detail: "1 out of 2 hunks FAILED".to_owned() },
        "failed (exit 1: 1 out of 2 hunks FAILED)"
    )]
    #[case::rejected_quietly(
        ApplyOutcome::Rejected { code: Some(1), detail: String::new() },
        "failed (exit 1)"
    )]
    #[case::unavailable(
        ApplyOutcome::ToolUnavailable { detail: "cannot run patch".to_owned() },
        "not applied (cannot run patch)"
    )]
    fn outcome_display(#[case] outcome: ApplyOutcome, #[case] expected: &str) {
        assert_eq!(outcome.to_string(), expected);
    }

    #[rstest]
    fn download_error_names_url() {
        let err = PatchError::Download {
            url: "https://www.drupal.org/files/issues/foo-1.patch".to_owned(),
            source: DownloadError::NotFound {
                url: "https://www.drupal.org/files/issues/foo-1.patch".to_owned(),
            },
        };
        assert!(err.to_string().contains("foo-1.patch"));
    }
}
