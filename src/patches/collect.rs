//! Patch discovery.
//!
//! Manifest-referenced patches are listed first, in manifest order, followed
//! by patch files vendored anywhere in the package tree, in path order.
//! Remote patches are downloaded into a caller-supplied directory so their
//! lifetime is tied to the pristine copy's scratch area.

use std::path::Path;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use super::{PatchError, PatchFile, PatchOrigin};
use crate::fetch::download::ReleaseSource;

static MANIFEST_ENTRY: LazyLock<Regex> = LazyLock::new(compile_manifest_entry);

#[expect(
    clippy::expect_used,
    reason = "the manifest pattern is a string literal covered by unit tests"
)]
fn compile_manifest_entry() -> Regex {
    Regex::new(r"^\s*-\s+(https?://\S+)").expect("manifest pattern must compile")
}

/// Naming conventions used while looking for patches.
#[derive(Debug, Clone, Copy)]
pub struct PatchConventions<'a> {
    /// Filename of the patch manifest at the package root.
    pub manifest: &'a str,
    /// Filename suffix of vendored patch files.
    pub suffix: &'a str,
}

/// Extract patch URLs from manifest contents, in order.
///
/// # Examples
///
/// ```
/// use hackcheck::patches::collect::manifest_urls;
///
/// let manifest = "The following patches have been applied to this project:\n\
///                 - https://www.drupal.org/files/issues/views-fix-1.patch\n";
/// assert_eq!(
///     manifest_urls(manifest),
///     vec!["https://www.drupal.org/files/issues/views-fix-1.patch"]
/// );
/// ```
#[must_use]
pub fn manifest_urls(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .filter_map(|line| MANIFEST_ENTRY.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Collect every patch that applies to the package at `package_dir`.
///
/// # Errors
///
/// Returns [`PatchError::Download`] when a manifest-referenced patch cannot
/// be retrieved; the caller must not treat the package as verifiable.
pub fn collect_patches(
    source: &dyn ReleaseSource,
    package_dir: &Path,
    conventions: PatchConventions<'_>,
    download_dir: &Path,
) -> Result<Vec<PatchFile>, PatchError> {
    let mut patches = fetch_manifest_patches(source, package_dir, conventions, download_dir)?;
    patches.extend(vendored_patches(package_dir, conventions.suffix)?);
    Ok(patches)
}

fn fetch_manifest_patches(
    source: &dyn ReleaseSource,
    package_dir: &Path,
    conventions: PatchConventions<'_>,
    download_dir: &Path,
) -> Result<Vec<PatchFile>, PatchError> {
    let manifest_path = package_dir.join(conventions.manifest);
    if !manifest_path.is_file() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&manifest_path).map_err(PatchError::Manifest)?;

    manifest_urls(&contents)
        .into_iter()
        .enumerate()
        .map(|(index, url)| {
            let dest = download_dir.join(format!("remote-{index:03}{}", conventions.suffix));
            debug!("downloading manifest patch {url}");
            source
                .download_file(url, &dest)
                .map_err(|err| PatchError::Download {
                    url: url.to_owned(),
                    source: err,
                })?;
            Ok(PatchFile {
                path: dest,
                origin: PatchOrigin::Remote {
                    url: url.to_owned(),
                },
            })
        })
        .collect()
}

fn vendored_patches(package_dir: &Path, suffix: &str) -> Result<Vec<PatchFile>, PatchError> {
    let mut patches = Vec::new();
    let walker = WalkDir::new(package_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        let is_patch = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(suffix));
        if is_patch {
            patches.push(PatchFile {
                path: std::path::absolute(entry.path())?,
                origin: PatchOrigin::Local,
            });
        }
    }
    Ok(patches)
}
