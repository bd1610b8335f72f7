//! Pristine release acquisition.
//!
//! Downloads a declared release into a private scratch directory, extracts
//! it and hands back a [`PristineCopy`] that owns the scratch directory. The
//! directory is removed when the copy is dropped, on every exit path, so
//! repeated audits cannot exhaust the disk.
//!
//! # Sub-modules
//!
//! - [`download`] - Release source trait and HTTP implementation.
//! - [`extraction`] - Archive extraction with format sniffing and path
//!   traversal protection.

pub mod download;
pub mod extraction;

use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempDir;

use crate::package::MachineName;
use download::{DownloadError, ReleaseSource};
use extraction::{ArchiveExtractor, ExtractionError};

const ARCHIVE_FILENAME: &str = "release.archive";
const SCRATCH_PREFIX: &str = "hackcheck-";

/// Errors arising while acquiring a pristine copy.
///
/// Every variant collapses to the same "fetch failed" status; the variant
/// only feeds the failure reason shown in reports.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The scratch directory could not be created or cleaned.
    #[error("cannot prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    /// Downloading the release failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extracting the release failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The release did not contain a top-level directory named after the package.
    #[error("release does not contain a {name}/ directory")]
    MissingPackageDirectory {
        /// The expected directory name.
        name: MachineName,
    },
}

/// An extracted release living in its own scratch directory.
///
/// Dropping the value deletes the scratch directory recursively.
#[derive(Debug)]
pub struct PristineCopy {
    scratch: TempDir,
    root: PathBuf,
}

impl PristineCopy {
    /// Root of the extracted package tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The owning scratch directory; files placed here share its lifetime.
    #[must_use]
    pub fn scratch(&self) -> &Path {
        self.scratch.path()
    }
}

/// Fetch and extract the release of `name` at `version`.
///
/// The scratch directory is created under `scratch_parent` when given, the
/// system temp directory otherwise. On failure the partially populated
/// scratch directory is removed before the error is returned.
///
/// # Errors
///
/// Returns [`FetchError`] if any step of download, extraction or layout
/// validation fails.
pub fn fetch_pristine(
    source: &dyn ReleaseSource,
    extractor: &dyn ArchiveExtractor,
    name: &MachineName,
    version: &str,
    scratch_parent: Option<&Path>,
) -> Result<PristineCopy, FetchError> {
    let scratch = create_scratch(scratch_parent)?;
    let archive_path = scratch.path().join(ARCHIVE_FILENAME);

    debug!("fetching {name} {version} into {}", scratch.path().display());
    source.download_release(name, version, &archive_path)?;
    extractor.extract(&archive_path, scratch.path())?;
    std::fs::remove_file(&archive_path).map_err(FetchError::Scratch)?;

    let root = scratch.path().join(name.as_str());
    if !root.is_dir() {
        return Err(FetchError::MissingPackageDirectory { name: name.clone() });
    }

    Ok(PristineCopy { scratch, root })
}

fn create_scratch(parent: Option<&Path>) -> Result<TempDir, FetchError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    let scratch = match parent {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    };
    scratch.map_err(FetchError::Scratch)
}
