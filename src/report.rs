//! Report formatting for verified packages.
//!
//! The human format is one line per package keyed by status, with optional
//! detail (patches, differing files, failure reasons) and optional nesting of
//! bundled sub-packages. The JSON format carries the same tree for scripts.

use serde::Serialize;

use crate::package::{Package, Status, UNKNOWN};
use crate::patches::{AppliedPatch, PatchOrigin};
use crate::quality::QualityReport;

/// What to include in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// List patches, differing files and failure reasons under each package.
    pub detailed: bool,
    /// Include bundled sub-packages.
    pub submodules: bool,
}

/// Format packages for human-readable output.
///
/// # Examples
///
/// ```
/// use hackcheck::report::{ReportOptions, format_human};
///
/// let output = format_human(&[], ReportOptions::default());
/// assert!(output.contains("No packages found"));
/// ```
#[must_use]
pub fn format_human(packages: &[Package], options: ReportOptions) -> String {
    if packages.is_empty() {
        return String::from("No packages found.\n");
    }

    let mut output = String::new();
    for package in packages {
        write_package(&mut output, package, options, 0);
    }
    output
}

fn write_package(output: &mut String, package: &Package, options: ReportOptions, depth: usize) {
    let indent = " ".repeat(depth);

    if depth > 0 {
        output.push_str(&format!("{indent}- {}\n", package.machine_name()));
    } else if options.detailed {
        write_detailed(output, package, &indent);
    } else {
        output.push_str(&summary_line(package));
        output.push('\n');
    }

    if depth == 0 {
        if let Some(report) = package.quality_report() {
            for (key, value) in report {
                output.push_str(&format!("{indent} {key}: {value}\n"));
            }
        }
    }

    if options.submodules {
        for child in package.children().values() {
            write_package(output, child, options, depth + 2);
        }
    }
}

fn write_detailed(output: &mut String, package: &Package, indent: &str) {
    output.push_str(&format!(
        "{} ({}): {} {}: {}\n",
        package.display_name(),
        package.machine_name(),
        package.version().unwrap_or(UNKNOWN),
        package.branch().unwrap_or(UNKNOWN),
        package.status(),
    ));
    for applied in package.patches() {
        output.push_str(&format!(
            "{indent} + {} ({})\n",
            applied.patch.path.display(),
            applied.outcome
        ));
    }
    if package.status() == Status::Hacked {
        for file in package.differing_files() {
            output.push_str(&format!("{indent} * {file}\n"));
        }
    }
    if let Some(reason) = package.failure() {
        output.push_str(&format!("{indent} ! {reason}\n"));
    }
}

fn summary_line(package: &Package) -> String {
    let head = format!(
        "{} ({}) {}: {}",
        package.display_name(),
        package.machine_name(),
        package.version().unwrap_or(UNKNOWN),
        package.status(),
    );
    let patches = package.patches().len();
    if package.status() == Status::Hacked {
        format!(
            "{head} ({patches} patches, {} bad files)",
            package.differing_files().len()
        )
    } else if patches > 0 {
        format!("{head} with {patches} patch(es)")
    } else {
        head
    }
}

/// Format packages as JSON.
///
/// # Examples
///
/// ```
/// use hackcheck::report::format_json;
///
/// let json = format_json(&[], true);
/// assert!(json.contains("\"packages\""));
/// ```
#[must_use]
pub fn format_json(packages: &[Package], submodules: bool) -> String {
    let report = AuditReportJson {
        packages: packages
            .iter()
            .map(|package| PackageEntry::from_package(package, submodules))
            .collect(),
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON-serializable audit report.
#[derive(Debug, Serialize)]
pub struct AuditReportJson<'a> {
    /// Top-level packages, sorted by machine name.
    pub packages: Vec<PackageEntry<'a>>,
}

/// JSON entry for a package.
#[derive(Debug, Serialize)]
pub struct PackageEntry<'a> {
    /// Machine-readable name.
    pub machine_name: &'a str,
    /// Human-readable name.
    pub name: &'a str,
    /// Grouping label from the descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<&'a str>,
    /// Declared version.
    pub version: Option<&'a str>,
    /// Declared release stream.
    pub branch: Option<&'a str>,
    /// Status keyword.
    pub status: &'static str,
    /// Error category, for `ERROR` packages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    /// Why verification failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'a str>,
    /// Patches replayed against the release.
    pub patches: Vec<PatchEntry<'a>>,
    /// Files that differ from the release.
    pub differing_files: &'a [String],
    /// Quality-check metrics, for custom packages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<&'a QualityReport>,
    /// Bundled sub-packages, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PackageEntry<'a>>,
}

impl<'a> PackageEntry<'a> {
    fn from_package(package: &'a Package, submodules: bool) -> Self {
        let status = package.status();
        let error = match status {
            Status::Error(kind) => Some(kind.label()),
            _ => None,
        };
        let children = if submodules {
            package
                .children()
                .values()
                .map(|child| Self::from_package(child, submodules))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            machine_name: package.machine_name().as_str(),
            name: package.display_name(),
            package: package.grouping(),
            version: package.version(),
            branch: package.branch(),
            status: status.keyword(),
            error,
            failure: package.failure(),
            patches: package.patches().iter().map(PatchEntry::from_applied).collect(),
            differing_files: package.differing_files(),
            quality: package.quality_report(),
            children,
        }
    }
}

/// JSON entry for a replayed patch.
#[derive(Debug, Serialize)]
pub struct PatchEntry<'a> {
    /// Local path of the patch file.
    pub path: String,
    /// Manifest URL, for downloaded patches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    /// Whether the patch applied cleanly.
    pub applied: bool,
    /// Human-readable outcome.
    pub outcome: String,
}

impl<'a> PatchEntry<'a> {
    fn from_applied(applied: &'a AppliedPatch) -> Self {
        let url = match &applied.patch.origin {
            PatchOrigin::Local => None,
            PatchOrigin::Remote { url } => Some(url.as_str()),
        };
        Self {
            path: applied.patch.path.display().to_string(),
            url,
            applied: applied.outcome.is_applied(),
            outcome: applied.outcome.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
