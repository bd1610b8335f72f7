//! Package descriptor parsing.
//!
//! Descriptors are Drupal `.info` (INI-like) or `.info.yml` files. Only five
//! attributes matter for verification and they are pulled out with
//! independent patterns rather than a full parser: when a descriptor repeats
//! an attribute (packaging scripts append a second `version` line, for
//! instance) the last occurrence wins.

use regex::Regex;
use std::sync::LazyLock;

static NAME: LazyLock<Regex> = LazyLock::new(|| compile(r#"(?i)\bname\s*[=:]\s*["']?([a-z0-9_ ]+)["']?"#));
static PROJECT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)\bproject\s*[=:]\s*["']?([a-z0-9_ ]+)["']?"#));
static PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)\bpackage\s*[=:]\s*["']?([a-z0-9_ ]+)["']?"#));
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)[0-9]+\.x-[0-9]+\.[0-9x]+-?[a-z0-9]*"));
static BRANCH: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)[0-9]+\.x-[0-9]+\."));

#[expect(
    clippy::expect_used,
    reason = "descriptor patterns are string literals covered by unit tests"
)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("descriptor pattern must compile")
}

/// Attributes extracted from a descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorInfo {
    /// Human-readable display name.
    pub name: Option<String>,
    /// Identifier of the distributed project this package belongs to.
    pub project: Option<String>,
    /// Grouping label shown on the administration pages.
    pub package: Option<String>,
    /// Declared release version, for example `7.x-1.0`.
    pub version: Option<String>,
    /// Release stream derived from the version, for example `7.x-1.x`.
    pub branch: Option<String>,
}

impl DescriptorInfo {
    /// Extracts descriptor attributes from file contents.
    ///
    /// # Examples
    ///
    /// ```
    /// use hackcheck::descriptor::DescriptorInfo;
    ///
    /// let info = DescriptorInfo::parse("name = Foo\nversion = \"7.x-1.2\"\nproject = \"foo\"\n");
    /// assert_eq!(info.name.as_deref(), Some("Foo"));
    /// assert_eq!(info.version.as_deref(), Some("7.x-1.2"));
    /// assert_eq!(info.branch.as_deref(), Some("7.x-1.x"));
    /// ```
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        Self {
            name: last_capture(&NAME, contents),
            project: last_capture(&PROJECT, contents),
            package: last_capture(&PACKAGE, contents),
            version: last_match(&VERSION, contents),
            branch: last_match(&BRANCH, contents).map(|prefix| format!("{prefix}x")),
        }
    }
}

/// Strips a descriptor suffix from `file_name`, returning the machine name.
///
/// Suffixes are tried in order, so callers list `.info.yml` before `.info`.
///
/// # Examples
///
/// ```
/// use hackcheck::descriptor::machine_name_from_file;
///
/// let suffixes = vec![".info.yml".to_owned(), ".info".to_owned()];
/// assert_eq!(machine_name_from_file("views.info.yml", &suffixes), Some("views"));
/// assert_eq!(machine_name_from_file("views.info", &suffixes), Some("views"));
/// assert_eq!(machine_name_from_file("views.module", &suffixes), None);
/// ```
#[must_use]
pub fn machine_name_from_file<'a>(file_name: &'a str, suffixes: &[String]) -> Option<&'a str> {
    suffixes
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix.as_str()))
        .filter(|stem| !stem.is_empty())
}

fn last_capture(pattern: &Regex, contents: &str) -> Option<String> {
    pattern
        .captures_iter(contents)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|value| !value.is_empty())
        .last()
}

fn last_match(pattern: &Regex, contents: &str) -> Option<String> {
    pattern
        .find_iter(contents)
        .map(|m| m.as_str().to_owned())
        .last()
}
