//! Audit configuration loaded from TOML.
//!
//! Every setting has a default matching the public Drupal distribution
//! service, so a run without `--config` audits against drupal.org. A
//! configuration file only needs to name the values it overrides; unknown keys
//! are rejected so typos surface instead of being silently ignored.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{AuditError, Result};

/// Settings for an audit run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Release archive URL template with `{name}` and `{version}` placeholders.
    pub release_url: String,
    /// Project page URL template with a `{name}` placeholder.
    ///
    /// A request that ends up anywhere else after redirects marks the package
    /// as not officially distributed.
    pub project_url: String,
    /// Global timeout applied to each HTTP request.
    pub download_timeout_secs: u64,
    /// Timeout applied to each external tool invocation.
    pub tool_timeout_secs: u64,
    /// Filename of the drush make patch manifest at a package's top level.
    pub patch_manifest: String,
    /// Filename suffix identifying vendored patch files.
    pub patch_suffix: String,
    /// Filename suffixes identifying package descriptors, longest first.
    pub descriptor_suffixes: Vec<String>,
    /// Path segments excluded from comparison at every depth.
    pub ignored_names: Vec<String>,
    /// Substring of a version string marking a development snapshot.
    pub dev_marker: String,
    /// Program used to apply patches.
    pub patch_program: String,
    /// Arguments passed to the patch program before `-d <dir>`.
    pub patch_args: Vec<String>,
    /// Quality check run against packages that are not officially distributed.
    pub quality_check: Option<QualityCheckConfig>,
    /// Parent directory for ephemeral work areas; the system temp dir if unset.
    pub scratch_dir: Option<Utf8PathBuf>,
}

impl AuditConfig {
    /// Loads configuration from `path`, or returns the defaults when `path`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ConfigRead`] if the file cannot be read and
    /// [`AuditError::InvalidConfig`] if it does not parse.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let Some(config_path) = path else {
            return Ok(Self::default());
        };
        let contents =
            std::fs::read_to_string(config_path).map_err(|source| AuditError::ConfigRead {
                path: config_path.to_owned(),
                source,
            })?;
        Self::from_toml(&contents).map_err(|reason| AuditError::InvalidConfig {
            path: config_path.to_owned(),
            reason,
        })
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the parser's message when the TOML is malformed or names an
    /// unknown key.
    ///
    /// # Examples
    ///
    /// ```
    /// use hackcheck::config::AuditConfig;
    ///
    /// let config = AuditConfig::from_toml("dev_marker = \"snapshot\"\n")?;
    /// assert_eq!(config.dev_marker, "snapshot");
    /// assert_eq!(config.patch_manifest, "PATCHES.txt");
    /// # Ok::<(), String>(())
    /// ```
    pub fn from_toml(source: &str) -> std::result::Result<Self, String> {
        toml::from_str(source).map_err(|e| e.to_string())
    }

    /// Returns the HTTP request timeout.
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Returns the external tool timeout.
    #[must_use]
    pub const fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            release_url: "https://ftp.drupal.org/files/projects/{name}-{version}.tar.gz".to_owned(),
            project_url: "https://www.drupal.org/project/{name}".to_owned(),
            download_timeout_secs: 30,
            tool_timeout_secs: 120,
            patch_manifest: "PATCHES.txt".to_owned(),
            patch_suffix: ".patch".to_owned(),
            descriptor_suffixes: vec![".info.yml".to_owned(), ".info".to_owned()],
            ignored_names: vec![
                ".git".to_owned(),
                "translations".to_owned(),
                "LICENSE.txt".to_owned(),
            ],
            dev_marker: "dev".to_owned(),
            patch_program: "patch".to_owned(),
            patch_args: vec![
                "-p1".to_owned(),
                "-s".to_owned(),
                "-t".to_owned(),
                "--no-backup-if-mismatch".to_owned(),
                "--reject-file=-".to_owned(),
            ],
            quality_check: Some(QualityCheckConfig::default()),
            scratch_dir: None,
        }
    }
}

/// External quality-check tool settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QualityCheckConfig {
    /// Program to run; its name prefixes the reported metric keys.
    pub program: String,
    /// Arguments passed before the package directory.
    pub args: Vec<String>,
}

impl Default for QualityCheckConfig {
    fn default() -> Self {
        Self {
            program: "phpcs".to_owned(),
            args: vec!["--standard=Drupal".to_owned()],
        }
    }
}
