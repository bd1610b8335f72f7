//! Per-package verification pipeline.
//!
//! Each package moves through a fixed sequence of checks and ends in exactly
//! one terminal [`Status`]:
//!
//! 1. no declared version or branch: `UNKNOWN`;
//! 2. not an officially distributed project: quality check, then `CUSTOM`;
//! 3. development snapshot: `DEV`;
//! 4. otherwise fetch the pristine release, replay known patches onto it and
//!    compare it with the local tree: `OK`, `HACKED` or `ERROR`.
//!
//! Every stage of step 4 returns an explicit error, and [`classify`] is the
//! one place where those outcomes become statuses. Nothing here changes the
//! process working directory, so packages can be verified concurrently
//! without coordination.

use std::io;
use std::path::Path;

use camino::Utf8Path;
use log::{debug, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::compare::{IgnoreSet, compare_trees};
use crate::config::AuditConfig;
use crate::fetch::download::ReleaseSource;
use crate::fetch::extraction::ArchiveExtractor;
use crate::fetch::{FetchError, PristineCopy, fetch_pristine};
use crate::package::{ErrorKind, MachineName, Package, Status};
use crate::patches::apply::PatchApplicator;
use crate::patches::collect::{PatchConventions, collect_patches};
use crate::patches::{AppliedPatch, PatchError};
use crate::quality::QualityCheck;

const PATCH_DOWNLOAD_PREFIX: &str = ".hackcheck-patches-";

/// Outcome of a comparison that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The patched release matches the local tree.
    Identical,
    /// At least one file differs.
    Modified,
}

/// Errors raised by the fetch, patch and compare stages.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The pristine release could not be acquired.
    #[error("unable to fetch release: {0}")]
    Fetch(#[from] FetchError),

    /// Known patches could not be collected.
    #[error(transparent)]
    Patches(#[from] PatchError),

    /// The local or pristine tree could not be read.
    #[error("comparison failed: {0}")]
    Compare(#[from] io::Error),
}

/// Map a comparison outcome to a terminal status.
///
/// # Examples
///
/// ```
/// use hackcheck::package::Status;
/// use hackcheck::pipeline::{Verdict, classify};
///
/// assert_eq!(classify(&Ok(Verdict::Identical)), Status::Ok);
/// assert_eq!(classify(&Ok(Verdict::Modified)), Status::Hacked);
/// ```
#[must_use]
pub fn classify(outcome: &Result<Verdict, StageError>) -> Status {
    match outcome {
        Ok(Verdict::Identical) => Status::Ok,
        Ok(Verdict::Modified) => Status::Hacked,
        Err(StageError::Fetch(_)) => Status::Error(ErrorKind::FetchFailed),
        Err(StageError::Patches(PatchError::Download { .. })) => {
            Status::Error(ErrorKind::PatchUnavailable)
        }
        Err(StageError::Patches(_) | StageError::Compare(_)) => Status::Error(ErrorKind::Internal),
    }
}

/// Verifies packages against their official releases.
///
/// Collaborators are borrowed so a single verifier can be shared across a
/// worker pool.
pub struct Verifier<'a> {
    config: &'a AuditConfig,
    source: &'a (dyn ReleaseSource + Sync),
    extractor: &'a (dyn ArchiveExtractor + Sync),
    applicator: &'a (dyn PatchApplicator + Sync),
    quality: Option<&'a (dyn QualityCheck + Sync)>,
}

impl<'a> Verifier<'a> {
    /// Create a verifier with no quality check.
    #[must_use]
    pub fn new(
        config: &'a AuditConfig,
        source: &'a (dyn ReleaseSource + Sync),
        extractor: &'a (dyn ArchiveExtractor + Sync),
        applicator: &'a (dyn PatchApplicator + Sync),
    ) -> Self {
        Self {
            config,
            source,
            extractor,
            applicator,
            quality: None,
        }
    }

    /// Run `quality` against packages that are not officially distributed.
    #[must_use]
    pub fn with_quality_check(mut self, quality: &'a (dyn QualityCheck + Sync)) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Verify one package and record the result on it.
    ///
    /// A package is verified at most once; calling this again logs a warning
    /// and returns the recorded status unchanged.
    pub fn verify(&self, package: &mut Package) -> Status {
        if package.is_verified() {
            warn!("{} already verified, keeping its result", package.machine_name());
            return package.status();
        }
        let status = self.evaluate(package);
        debug!("{} {}: {status}", package.machine_name(), package.version().unwrap_or_default());
        package.status = Some(status);
        status
    }

    /// Verify every package in `packages` on the current rayon pool.
    ///
    /// Bundled sub-packages are verified too, each independently, when
    /// `include_children` is set.
    pub fn verify_all(&self, packages: &mut [Package], include_children: bool) {
        packages
            .par_iter_mut()
            .for_each(|package| self.verify_tree(package, include_children));
    }

    fn verify_tree(&self, package: &mut Package, include_children: bool) {
        self.verify(package);
        if include_children {
            package
                .children_mut()
                .par_iter_mut()
                .for_each(|(_, child)| self.verify_tree(child, include_children));
        }
    }

    fn evaluate(&self, package: &mut Package) -> Status {
        let declared = package
            .version()
            .zip(package.branch())
            .filter(|(version, branch)| !version.is_empty() && !branch.is_empty());
        let Some((version, _)) = declared else {
            return Status::Unknown;
        };
        let version = version.to_owned();

        if !self.is_official(package.machine_name()) {
            package.quality_report = self
                .quality
                .and_then(|quality| quality.check(package.directory()));
            return Status::Custom;
        }

        let marker = self.config.dev_marker.as_str();
        if !marker.is_empty() && version.contains(marker) {
            return Status::Dev;
        }

        let outcome = self.compare_with_release(package, &version);
        if let Err(err) = &outcome {
            warn!("{} {version}: {err}", package.machine_name());
            package.failure = Some(err.to_string());
        }
        classify(&outcome)
    }

    fn is_official(&self, name: &MachineName) -> bool {
        self.source.is_official(name).unwrap_or_else(|err| {
            warn!("existence probe for {name} failed, treating as custom: {err}");
            false
        })
    }

    /// Fetch, patch and compare. The pristine copy is dropped, and its
    /// scratch directory removed, before this returns.
    fn compare_with_release(
        &self,
        package: &mut Package,
        version: &str,
    ) -> Result<Verdict, StageError> {
        let pristine = fetch_pristine(
            self.source,
            self.extractor,
            package.machine_name(),
            version,
            self.config.scratch_dir.as_deref().map(Utf8Path::as_std_path),
        )?;

        package.patches = self.replay_patches(&pristine, package.directory())?;

        let ignore = self.ignore_set(package.directory())?;
        package.differing_files = compare_trees(pristine.root(), package.directory(), &ignore)?;

        if package.differing_files.is_empty() {
            Ok(Verdict::Identical)
        } else {
            Ok(Verdict::Modified)
        }
    }

    fn replay_patches(
        &self,
        pristine: &PristineCopy,
        package_dir: &Path,
    ) -> Result<Vec<AppliedPatch>, StageError> {
        // Uniquely named so it cannot collide with the extracted release.
        let download_dir = tempfile::Builder::new()
            .prefix(PATCH_DOWNLOAD_PREFIX)
            .tempdir_in(pristine.scratch())?;

        let conventions = PatchConventions {
            manifest: &self.config.patch_manifest,
            suffix: &self.config.patch_suffix,
        };
        let patches =
            collect_patches(self.source, package_dir, conventions, download_dir.path())?;

        Ok(patches
            .into_iter()
            .map(|patch| {
                let outcome = self.applicator.apply(pristine.root(), &patch.path);
                AppliedPatch { patch, outcome }
            })
            .collect())
    }

    /// Configured names plus the patch manifest and every descriptor or patch
    /// filename found in the local tree.
    fn ignore_set(&self, package_dir: &Path) -> Result<IgnoreSet, StageError> {
        let mut ignore = IgnoreSet::new(self.config.ignored_names.iter().map(String::as_str));
        ignore.insert(self.config.patch_manifest.as_str());

        let walker = WalkDir::new(package_dir)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !ignore.contains(entry.file_name()));
        let mut found = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if self.is_metadata_file(name) {
                found.push(name.to_owned());
            }
        }

        for name in found {
            ignore.insert(name);
        }
        Ok(ignore)
    }

    fn is_metadata_file(&self, name: &str) -> bool {
        name.ends_with(self.config.patch_suffix.as_str())
            || self
                .config
                .descriptor_suffixes
                .iter()
                .any(|suffix| name.ends_with(suffix.as_str()))
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
