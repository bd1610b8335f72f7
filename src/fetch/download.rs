//! Release retrieval from the distribution service.
//!
//! Provides a trait-based abstraction over the three HTTP interactions the
//! pipeline needs (release archive, remote patch, project existence probe),
//! enabling dependency injection for testing.

use std::path::Path;
use std::time::Duration;

use ureq::ResponseExt;

use crate::config::AuditConfig;
use crate::package::MachineName;

/// Trait for talking to the release distribution service.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseSource {
    /// Download the release archive for `name` at `version` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or file write fails.
    fn download_release(
        &self,
        name: &MachineName,
        version: &str,
        dest: &Path,
    ) -> Result<(), DownloadError>;

    /// Download an arbitrary URL (a remote patch) into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or file write fails.
    fn download_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;

    /// Probe whether `name` is an officially distributed project.
    ///
    /// # Errors
    ///
    /// Returns an error when the probe itself could not be completed, as
    /// opposed to completing with a negative answer.
    fn is_official(&self, name: &MachineName) -> Result<bool, DownloadError>;
}

/// Errors arising from download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based release source using `ureq`.
#[derive(Clone)]
pub struct HttpReleaseSource {
    agent: ureq::Agent,
    release_url: String,
    project_url: String,
}

impl HttpReleaseSource {
    /// Build a source from the URL templates and timeout in `config`.
    #[must_use]
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            agent: http_agent(config.download_timeout()),
            release_url: config.release_url.clone(),
            project_url: config.project_url.clone(),
        }
    }

    /// Expand the release URL template for a package version.
    ///
    /// # Examples
    ///
    /// ```
    /// use hackcheck::config::AuditConfig;
    /// use hackcheck::fetch::download::HttpReleaseSource;
    /// use hackcheck::package::MachineName;
    ///
    /// let source = HttpReleaseSource::new(&AuditConfig::default());
    /// let url = source.release_url(&MachineName::from("views"), "7.x-3.11");
    /// assert!(url.ends_with("/files/projects/views-7.x-3.11.tar.gz"));
    /// ```
    #[must_use]
    pub fn release_url(&self, name: &MachineName, version: &str) -> String {
        self.release_url
            .replace("{name}", name.as_str())
            .replace("{version}", version)
    }

    /// Expand the project page URL template.
    #[must_use]
    pub fn project_url(&self, name: &MachineName) -> String {
        self.project_url.replace("{name}", name.as_str())
    }
}

impl ReleaseSource for HttpReleaseSource {
    fn download_release(
        &self,
        name: &MachineName,
        version: &str,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        let url = self.release_url(name, version);
        download_to_file(&self.agent, &url, dest)
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        download_to_file(&self.agent, url, dest)
    }

    fn is_official(&self, name: &MachineName) -> Result<bool, DownloadError> {
        let url = self.project_url(name);
        match self.agent.get(&url).call() {
            // Unknown projects are redirected to an error page.
            Ok(response) => Ok(response.get_uri().to_string() == url),
            Err(ureq::Error::StatusCode(_)) => Ok(false),
            Err(other) => Err(map_ureq_error(&url, &other)),
        }
    }
}

/// Download a URL and write the body to a file.
fn download_to_file(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<(), DownloadError> {
    let response = agent.get(url).call().map_err(|e| map_ureq_error(url, &e))?;
    let mut file = std::fs::File::create(dest)?;
    std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(DownloadError::Io)?;
    Ok(())
}

/// `ureq` agent with request timeout configuration.
fn http_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
