//! Shared test utilities: canned process output, in-memory archives and stub
//! collaborators that never touch the network.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::fetch::download::{DownloadError, ReleaseSource};
use crate::package::MachineName;
use crate::patches::ApplyOutcome;
use crate::patches::apply::PatchApplicator;
use crate::quality::{QualityCheck, QualityReport};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Creates a failed command `Output` with the given stdout text, as a linter
/// that found problems would produce.
pub fn failure_output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(2),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Builds a gzip-compressed tar archive holding `files` as `(path, contents)`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
pub fn tar_gz_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .expect("finish tar.gz archive")
}

/// Builds a zip archive holding `files` as `(path, contents)`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (path, contents) in files {
        writer.start_file(*path, options).expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish zip archive").into_inner()
}

/// Writes `files` as `(relative path, contents)` beneath `root`.
///
/// # Panics
///
/// Panics if a file or directory cannot be created.
#[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, contents) in files {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&target, contents).expect("write tree file");
    }
}

/// Descriptor text declaring `name` with an optional version.
pub fn descriptor_text(name: &str, version: Option<&str>) -> String {
    let version_line = version
        .map(|version| format!("version = \"{version}\"\n"))
        .unwrap_or_default();
    format!("name = \"{name}\"\ncore = 7.x\n{version_line}")
}

/// A release source that serves canned archives and patches from memory.
///
/// Every request is recorded so tests can assert on network side effects.
#[derive(Debug, Default)]
pub struct StubReleaseSource {
    releases: HashMap<(String, String), Vec<u8>>,
    patches: HashMap<String, String>,
    unofficial: HashSet<String>,
    unreachable_probes: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl StubReleaseSource {
    /// Creates a source where every project is official and nothing is released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `archive` as the release of `name` at `version`.
    #[must_use]
    pub fn with_release(mut self, name: &str, version: &str, archive: Vec<u8>) -> Self {
        self.releases
            .insert((name.to_owned(), version.to_owned()), archive);
        self
    }

    /// Serves `contents` at `url`.
    #[must_use]
    pub fn with_patch(mut self, url: &str, contents: &str) -> Self {
        self.patches.insert(url.to_owned(), contents.to_owned());
        self
    }

    /// Marks `name` as not officially distributed.
    #[must_use]
    pub fn with_unofficial(mut self, name: &str) -> Self {
        self.unofficial.insert(name.to_owned());
        self
    }

    /// Makes the existence probe for `name` fail outright.
    #[must_use]
    pub fn with_unreachable_probe(mut self, name: &str) -> Self {
        self.unreachable_probes.insert(name.to_owned());
        self
    }

    /// Every request made so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the request log mutex is poisoned.
    #[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock").clone()
    }

    #[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
    fn record(&self, request: String) {
        self.requests.lock().expect("request log lock").push(request);
    }
}

impl ReleaseSource for StubReleaseSource {
    fn download_release(
        &self,
        name: &MachineName,
        version: &str,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        let url = format!("stub://releases/{name}-{version}.tar.gz");
        self.record(url.clone());
        let archive = self
            .releases
            .get(&(name.as_str().to_owned(), version.to_owned()))
            .ok_or(DownloadError::NotFound { url })?;
        std::fs::write(dest, archive)?;
        Ok(())
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.record(url.to_owned());
        let contents = self.patches.get(url).ok_or_else(|| DownloadError::NotFound {
            url: url.to_owned(),
        })?;
        std::fs::write(dest, contents)?;
        Ok(())
    }

    fn is_official(&self, name: &MachineName) -> Result<bool, DownloadError> {
        self.record(format!("stub://project/{name}"));
        if self.unreachable_probes.contains(name.as_str()) {
            return Err(DownloadError::HttpError {
                url: format!("stub://project/{name}"),
                reason: "connection refused".to_owned(),
            });
        }
        Ok(!self.unofficial.contains(name.as_str()))
    }
}

/// A patch applicator that replays scripted file writes instead of diffs.
///
/// Each patch filename maps to the files it writes into the target tree;
/// unknown patches are rejected the way a real tool rejects a stale diff.
#[derive(Debug, Default)]
pub struct StubApplicator {
    effects: HashMap<String, Vec<(String, String)>>,
    applied: Mutex<Vec<PathBuf>>,
}

impl StubApplicator {
    /// Creates an applicator that rejects every patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applying a patch named `patch_name` writes `contents` to `path`.
    #[must_use]
    pub fn with_effect(mut self, patch_name: &str, path: &str, contents: &str) -> Self {
        self.effects
            .entry(patch_name.to_owned())
            .or_default()
            .push((path.to_owned(), contents.to_owned()));
        self
    }

    /// Patch paths passed to `apply`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the log mutex is poisoned.
    #[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
    pub fn applied(&self) -> Vec<PathBuf> {
        self.applied.lock().expect("applied log lock").clone()
    }
}

impl PatchApplicator for StubApplicator {
    #[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
    fn apply(&self, target_dir: &Path, patch: &Path) -> ApplyOutcome {
        self.applied
            .lock()
            .expect("applied log lock")
            .push(patch.to_path_buf());
        let name = patch
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let Some(effects) = self.effects.get(name) else {
            return ApplyOutcome::Rejected {
                code: Some(1),
                detail: "Hunk #1 FAILED at 1.".to_owned(),
            };
        };
        for (path, contents) in effects {
            std::fs::write(target_dir.join(path), contents).expect("write patched file");
        }
        ApplyOutcome::Applied
    }
}

/// A quality check that returns a fixed report.
#[derive(Debug, Clone, Default)]
pub struct StubQualityCheck {
    report: Option<QualityReport>,
}

impl StubQualityCheck {
    /// Creates a check that always returns `report`.
    pub fn new(report: Option<QualityReport>) -> Self {
        Self { report }
    }
}

impl QualityCheck for StubQualityCheck {
    fn check(&self, _dir: &Path) -> Option<QualityReport> {
        self.report.clone()
    }
}
