//! Package discovery beneath an audit root.
//!
//! Every descriptor file found while walking the root becomes a [`Package`].
//! A package whose descriptor names another discovered package as its
//! project is bundled with that package and attached as a child; everything
//! else is returned at the top level, sorted by machine name.

use std::collections::BTreeMap;

use camino::Utf8Path;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::AuditConfig;
use crate::descriptor::machine_name_from_file;
use crate::error::{AuditError, Result};
use crate::package::{MachineName, Package};

/// Discover the packages beneath `root`.
///
/// Directories named in [`AuditConfig::ignored_names`] are not entered.
/// When two descriptors share a machine name, the first one walked wins and
/// the other is logged and dropped.
///
/// # Errors
///
/// Returns [`AuditError::RootNotFound`] when `root` is not a directory and
/// [`AuditError::DiscoveryFailed`] when it cannot be read at all. Unreadable
/// entries deeper in the tree are logged and skipped.
pub fn discover(root: &Utf8Path, config: &AuditConfig) -> Result<Vec<Package>> {
    if !root.is_dir() {
        return Err(AuditError::RootNotFound {
            path: root.to_owned(),
        });
    }

    let mut found: BTreeMap<MachineName, Package> = BTreeMap::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !config
                    .ignored_names
                    .iter()
                    .any(|name| entry.file_name() == name.as_str())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(AuditError::DiscoveryFailed {
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_descriptor(entry.file_name(), config) {
            continue;
        }

        let package = match Package::from_descriptor(entry.path(), &config.descriptor_suffixes) {
            Ok(Some(package)) => package,
            Ok(None) => continue,
            Err(err) => {
                warn!("skipping unreadable descriptor {}: {err}", entry.path().display());
                continue;
            }
        };

        if let Some(existing) = found.get(package.machine_name()) {
            warn!(
                "duplicate package {} at {}, keeping {}",
                package.machine_name(),
                package.descriptor().display(),
                existing.descriptor().display()
            );
            continue;
        }
        debug!("found {} at {}", package.machine_name(), package.directory().display());
        found.insert(package.machine_name().clone(), package);
    }

    Ok(nest(found))
}

fn is_descriptor(file_name: &std::ffi::OsStr, config: &AuditConfig) -> bool {
    file_name
        .to_str()
        .and_then(|name| machine_name_from_file(name, &config.descriptor_suffixes))
        .is_some()
}

/// Attach sub-packages to the package named by their `project`.
fn nest(mut packages: BTreeMap<MachineName, Package>) -> Vec<Package> {
    let owned: Vec<(MachineName, MachineName)> = packages
        .values()
        .filter(|package| package.is_sub_package())
        .filter_map(|package| {
            let parent = MachineName::from(package.project()?);
            packages
                .contains_key(&parent)
                .then(|| (package.machine_name().clone(), parent))
        })
        .collect();

    let mut children = Vec::with_capacity(owned.len());
    for (name, parent) in owned {
        if let Some(child) = packages.remove(&name) {
            children.push((parent, child));
        }
    }
    for (parent, child) in children {
        match packages.get_mut(&parent) {
            Some(owner) => owner.add_child(child),
            None => {
                // The owner was itself a sub-package of something else.
                packages.insert(child.machine_name().clone(), child);
            }
        }
    }

    packages.into_values().collect()
}
