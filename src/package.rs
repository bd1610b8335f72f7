//! The package entity and its verification status.
//!
//! A [`Package`] is created from a descriptor file and carries everything a
//! report needs: identity, declared release, the patches that were replayed
//! and the files that differ from the pristine release. Verification results
//! are written exactly once by [`crate::pipeline::Verifier`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::descriptor::{DescriptorInfo, machine_name_from_file};
use crate::patches::AppliedPatch;
use crate::quality::QualityReport;

/// Placeholder shown for descriptor attributes that are absent.
pub const UNKNOWN: &str = "unknown";

/// A package's machine-readable name, derived from its descriptor filename.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineName(String);

impl MachineName {
    /// Create a new machine name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the machine name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MachineName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MachineName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for MachineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a package ended in [`Status::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The pristine release could not be downloaded or extracted.
    FetchFailed,
    /// A patch referenced by the patch manifest could not be retrieved.
    PatchUnavailable,
    /// The local tree could not be read while replaying or comparing.
    Internal,
}

impl ErrorKind {
    /// Short label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FetchFailed => "fetch failed",
            Self::PatchUnavailable => "patch unavailable",
            Self::Internal => "internal error",
        }
    }
}

/// Terminal verification status of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Version or branch is undeclared; nothing can be compared.
    Unknown,
    /// Not an officially distributed project.
    Custom,
    /// A development snapshot with no fixed release to compare against.
    Dev,
    /// At least one file differs from the patched pristine release.
    Hacked,
    /// Identical to the patched pristine release.
    Ok,
    /// Verification could not complete.
    Error(ErrorKind),
}

impl Status {
    /// Upper-case status keyword used in reports.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Custom => "CUSTOM",
            Self::Dev => "DEV",
            Self::Hacked => "HACKED",
            Self::Ok => "OK",
            Self::Error(_) => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(ErrorKind::Internal) => write!(f, "ERROR (internal error)"),
            other => f.write_str(other.keyword()),
        }
    }
}

/// A vendored package identified by a descriptor file.
#[derive(Debug, Clone)]
pub struct Package {
    machine_name: MachineName,
    info: DescriptorInfo,
    directory: PathBuf,
    descriptor: PathBuf,
    pub(crate) patches: Vec<AppliedPatch>,
    pub(crate) differing_files: Vec<String>,
    pub(crate) status: Option<Status>,
    pub(crate) failure: Option<String>,
    pub(crate) quality_report: Option<QualityReport>,
    children: BTreeMap<MachineName, Package>,
}

impl Package {
    /// Create a package from already-parsed descriptor attributes.
    ///
    /// `directory` is the package root that gets compared; `descriptor` is
    /// the file the attributes came from.
    #[must_use]
    pub fn new(
        machine_name: MachineName,
        info: DescriptorInfo,
        directory: PathBuf,
        descriptor: PathBuf,
    ) -> Self {
        Self {
            machine_name,
            info,
            directory,
            descriptor,
            patches: Vec::new(),
            differing_files: Vec::new(),
            status: None,
            failure: None,
            quality_report: None,
            children: BTreeMap::new(),
        }
    }

    /// Read and parse the descriptor at `path`.
    ///
    /// Returns `Ok(None)` when the filename carries none of `suffixes`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while reading the descriptor.
    pub fn from_descriptor(path: &Path, suffixes: &[String]) -> std::io::Result<Option<Self>> {
        let Some(machine_name) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| machine_name_from_file(name, suffixes))
        else {
            return Ok(None);
        };
        let contents = std::fs::read_to_string(path)?;
        let directory = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Some(Self::new(
            MachineName::from(machine_name),
            DescriptorInfo::parse(&contents),
            directory,
            path.to_path_buf(),
        )))
    }

    /// Machine-readable name.
    #[must_use]
    pub const fn machine_name(&self) -> &MachineName {
        &self.machine_name
    }

    /// Human-readable name, or `unknown`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.info.name.as_deref().unwrap_or(UNKNOWN)
    }

    /// Declared version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.info.version.as_deref()
    }

    /// Declared release stream, if any.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.info.branch.as_deref()
    }

    /// Distributed project this package belongs to, if declared.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.info.project.as_deref()
    }

    /// Grouping label, if declared.
    #[must_use]
    pub fn grouping(&self) -> Option<&str> {
        self.info.package.as_deref()
    }

    /// Package root directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Descriptor file path.
    #[must_use]
    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    /// Patches replayed against the pristine release, in application order.
    #[must_use]
    pub fn patches(&self) -> &[AppliedPatch] {
        &self.patches
    }

    /// Paths relative to the package root that differ from the release.
    #[must_use]
    pub fn differing_files(&self) -> &[String] {
        &self.differing_files
    }

    /// Verification status; `Unknown` until verified.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status.unwrap_or(Status::Unknown)
    }

    /// Whether verification has already run on this instance.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.status.is_some()
    }

    /// Reason verification failed, when the status is an error.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Metrics from the quality check, for custom packages.
    #[must_use]
    pub const fn quality_report(&self) -> Option<&QualityReport> {
        self.quality_report.as_ref()
    }

    /// Whether this package declares a different project as its owner.
    #[must_use]
    pub fn is_sub_package(&self) -> bool {
        self.project()
            .is_some_and(|project| project != self.machine_name.as_str())
    }

    /// Bundled sub-packages keyed by machine name.
    #[must_use]
    pub const fn children(&self) -> &BTreeMap<MachineName, Self> {
        &self.children
    }

    /// Mutable access to bundled sub-packages.
    pub fn children_mut(&mut self) -> &mut BTreeMap<MachineName, Self> {
        &mut self.children
    }

    /// Attach a bundled sub-package, replacing any with the same name.
    pub fn add_child(&mut self, child: Self) {
        self.children.insert(child.machine_name.clone(), child);
    }
}
