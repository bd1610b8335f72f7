//! Recursive directory comparison.
//!
//! Compares a reference tree (the patched pristine release) against a target
//! tree (the local package) and reports every file that is byte-different or
//! present on only one side, as a `/`-separated path relative to the tree
//! roots. Entries whose name is in the [`IgnoreSet`] are skipped at every
//! depth, together with everything beneath them.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::trace;
use walkdir::WalkDir;

const CHUNK: usize = 8 * 1024;

/// Exact file or directory names excluded from comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    names: BTreeSet<OsString>,
}

impl IgnoreSet {
    /// Create an ignore set from names.
    ///
    /// # Examples
    ///
    /// ```
    /// use hackcheck::compare::IgnoreSet;
    /// use std::ffi::OsStr;
    ///
    /// let ignore = IgnoreSet::new([".git", "LICENSE.txt"]);
    /// assert!(ignore.contains(OsStr::new(".git")));
    /// assert!(!ignore.contains(OsStr::new("README.txt")));
    /// ```
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a name to the set.
    pub fn insert(&mut self, name: impl Into<OsString>) {
        self.names.insert(name.into());
    }

    /// Whether `name` is ignored.
    #[must_use]
    pub fn contains(&self, name: &OsStr) -> bool {
        self.names.contains(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Dir,
    Symlink,
    Other,
}

/// Compare `reference` against `target`, returning the sorted relative paths
/// of every differing file.
///
/// Running the comparison twice over unchanged trees yields the same list.
///
/// # Errors
///
/// Returns any I/O error raised while listing directories or reading files.
pub fn compare_trees(reference: &Path, target: &Path, ignore: &IgnoreSet) -> io::Result<Vec<String>> {
    let mut differing = BTreeSet::new();
    compare_dirs(reference, target, "", ignore, &mut differing)?;
    Ok(differing.into_iter().collect())
}

fn compare_dirs(
    reference: &Path,
    target: &Path,
    prefix: &str,
    ignore: &IgnoreSet,
    differing: &mut BTreeSet<String>,
) -> io::Result<()> {
    let left = list_dir(reference, ignore)?;
    let right = list_dir(target, ignore)?;
    let names: BTreeSet<&OsString> = left.keys().chain(right.keys()).collect();

    for name in names {
        let relative = format!("{prefix}{}", name.to_string_lossy());
        let left_path = reference.join(name);
        let right_path = target.join(name);

        match (left.get(name), right.get(name)) {
            (Some(Kind::Dir), Some(Kind::Dir)) => {
                compare_dirs(
                    &left_path,
                    &right_path,
                    &format!("{relative}/"),
                    ignore,
                    differing,
                )?;
            }
            (Some(Kind::File), Some(Kind::File)) => {
                if !files_equal(&left_path, &right_path)? {
                    trace!("content differs: {relative}");
                    differing.insert(relative);
                }
            }
            (Some(Kind::Symlink), Some(Kind::Symlink)) => {
                if std::fs::read_link(&left_path)? != std::fs::read_link(&right_path)? {
                    trace!("link target differs: {relative}");
                    differing.insert(relative);
                }
            }
            (left_kind, right_kind) => {
                trace!("present on one side only or type changed: {relative}");
                one_sided(left_kind, &left_path, &relative, ignore, differing)?;
                one_sided(right_kind, &right_path, &relative, ignore, differing)?;
            }
        }
    }
    Ok(())
}

/// Record everything under a path whose counterpart is missing or of
/// another type.
fn one_sided(
    kind: Option<&Kind>,
    path: &Path,
    relative: &str,
    ignore: &IgnoreSet,
    differing: &mut BTreeSet<String>,
) -> io::Result<()> {
    match kind {
        None => Ok(()),
        Some(Kind::Dir) => {
            let before = differing.len();
            for file in files_under(path, ignore)? {
                differing.insert(format!("{relative}/{file}"));
            }
            if differing.len() == before {
                differing.insert(relative.to_owned());
            }
            Ok(())
        }
        Some(_) => {
            differing.insert(relative.to_owned());
            Ok(())
        }
    }
}

fn files_under(dir: &Path, ignore: &IgnoreSet) -> io::Result<Vec<String>> {
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !ignore.contains(entry.file_name()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).map_err(io::Error::other)?;
        let segments: Vec<_> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect();
        files.push(segments.join("/"));
    }
    Ok(files)
}

fn list_dir(dir: &Path, ignore: &IgnoreSet) -> io::Result<BTreeMap<OsString, Kind>> {
    let mut entries = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if ignore.contains(&name) {
            continue;
        }
        let file_type = entry.file_type()?;
        let kind = if file_type.is_symlink() {
            Kind::Symlink
        } else if file_type.is_dir() {
            Kind::Dir
        } else if file_type.is_file() {
            Kind::File
        } else {
            Kind::Other
        };
        entries.insert(name, kind);
    }
    Ok(entries)
}

/// Byte-for-byte equality of two regular files.
fn files_equal(left: &Path, right: &Path) -> io::Result<bool> {
    if std::fs::metadata(left)?.len() != std::fs::metadata(right)?.len() {
        return Ok(false);
    }

    let mut left_reader = BufReader::new(File::open(left)?);
    let mut right_reader = BufReader::new(File::open(right)?);
    let mut left_buf = vec![0_u8; CHUNK];
    let mut right_buf = vec![0_u8; CHUNK];

    loop {
        let read = left_reader.read(&mut left_buf)?;
        if read == 0 {
            // Equal lengths, so the right side must be exhausted too.
            return Ok(right_reader.read(&mut right_buf)? == 0);
        }
        let (Some(left_chunk), Some(right_chunk)) = (left_buf.get(..read), right_buf.get_mut(..read))
        else {
            return Ok(false);
        };
        right_reader.read_exact(right_chunk)?;
        if left_chunk != right_chunk {
            return Ok(false);
        }
    }
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
