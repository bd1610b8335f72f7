//! Static-analysis report for packages that have no official release.
//!
//! Custom code cannot be compared against anything, so the audit runs a
//! coding-standards tool over it instead and keeps the error and warning
//! totals as a secondary report.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;

use crate::config::QualityCheckConfig;
use crate::process::{CommandExecutor, Invocation, SystemCommandExecutor};

/// Named metrics produced by a quality check.
pub type QualityReport = BTreeMap<String, u64>;

static ERRORS: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bFOUND\s+(\d+)\s+ERRORS?\b"));
static WARNINGS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\bFOUND\b.*?(\d+)\s+WARNINGS?\b"));

#[expect(
    clippy::expect_used,
    reason = "quality patterns are string literals covered by unit tests"
)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("quality pattern must compile")
}

/// Produces a quality report for a package directory.
#[cfg_attr(test, mockall::automock)]
pub trait QualityCheck {
    /// Check the tree at `dir`; `None` when no report could be produced.
    fn check(&self, dir: &Path) -> Option<QualityReport>;
}

/// Runs an external coding-standards tool and scans its summary lines.
#[derive(Debug, Clone)]
pub struct CommandQualityCheck<E = SystemCommandExecutor> {
    executor: E,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandQualityCheck {
    /// Build a check that runs on the host system.
    #[must_use]
    pub fn new(config: &QualityCheckConfig, timeout: Duration) -> Self {
        Self::with_executor(SystemCommandExecutor, config, timeout)
    }
}

impl<E: CommandExecutor> CommandQualityCheck<E> {
    /// Build a check that runs through `executor`.
    #[must_use]
    pub fn with_executor(executor: E, config: &QualityCheckConfig, timeout: Duration) -> Self {
        Self {
            executor,
            program: config.program.clone(),
            args: config.args.clone(),
            timeout,
        }
    }
}

impl<E: CommandExecutor> QualityCheck for CommandQualityCheck<E> {
    fn check(&self, dir: &Path) -> Option<QualityReport> {
        let mut args = self.args.clone();
        args.push(dir.display().to_string());
        let invocation = Invocation {
            program: self.program.clone(),
            args,
            stdin: None,
            timeout: self.timeout,
        };

        // Coding-standards tools exit non-zero whenever they find anything,
        // so only a failure to run counts as "no report".
        match self.executor.run(&invocation) {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let report = parse_quality_output(&self.program, &stdout);
                debug!("{} on {}: {report:?}", self.program, dir.display());
                Some(report)
            }
            Err(err) => {
                warn!("quality check skipped for {}: {err}", dir.display());
                None
            }
        }
    }
}

/// Sum every error and warning count announced in `output`.
///
/// # Examples
///
/// ```
/// use hackcheck::quality::parse_quality_output;
///
/// let output = "FOUND 3 ERRORS AND 2 WARNINGS AFFECTING 4 LINES\n\
///               FOUND 1 ERROR AFFECTING 1 LINE\n";
/// let report = parse_quality_output("phpcs", output);
/// assert_eq!(report.get("phpcs errors"), Some(&4));
/// assert_eq!(report.get("phpcs warnings"), Some(&2));
/// ```
#[must_use]
pub fn parse_quality_output(program: &str, output: &str) -> QualityReport {
    let tool = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program);
    QualityReport::from([
        (format!("{tool} errors"), sum_counts(&ERRORS, output)),
        (format!("{tool} warnings"), sum_counts(&WARNINGS, output)),
    ])
}

fn sum_counts(pattern: &Regex, output: &str) -> u64 {
    pattern
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .filter_map(|count| count.as_str().parse::<u64>().ok())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockCommandExecutor, ToolError};
    use crate::test_utils::{failure_output_with_stdout, success_output};
    use rstest::rstest;

    #[rstest]
    #[case::clean("", 0, 0)]
    #[case::errors_only("FOUND 2 ERRORS AFFECTING 2 LINES", 2, 0)]
    #[case::singular("FOUND 1 ERROR AND 1 WARNING AFFECTING 1 LINE", 1, 1)]
    #[case::warnings_only("FOUND 0 ERRORS AND 12 WARNINGS AFFECTING 9 LINES", 0, 12)]
    #[case::summed(
        "FOUND 3 ERRORS AND 2 WARNINGS AFFECTING 4 LINES\nFOUND 5 ERRORS AFFECTING 5 LINES\nfound 0 errors and 4 warnings",
        8,
        6
    )]
    fn parses_summary_lines(#[case] output: &str, #[case] errors: u64, #[case] warnings: u64) {
        let report = parse_quality_output("phpcs", output);
        assert_eq!(report.get("phpcs errors"), Some(&errors));
        assert_eq!(report.get("phpcs warnings"), Some(&warnings));
    }

    #[rstest]
    fn keys_use_program_file_name() {
        let report = parse_quality_output("/usr/local/bin/phpcs", "");
        assert!(report.contains_key("phpcs errors"));
    }

    #[rstest]
    fn findings_exit_status_still_reports() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .withf(|call| {
                call.program == "phpcs"
                    && call.args == vec!["--standard=Drupal", "/srv/custom"]
            })
            .returning(|_| Ok(failure_output_with_stdout("FOUND 1 ERROR AFFECTING 1 LINE\n")));

        let check = CommandQualityCheck::with_executor(
            executor,
            &QualityCheckConfig::default(),
            Duration::from_secs(5),
        );
        let report = check.check(Path::new("/srv/custom")).expect("report produced");

        assert_eq!(report.get("phpcs errors"), Some(&1));
    }

    #[rstest]
    fn clean_run_reports_zeroes() {
        let mut executor = MockCommandExecutor::new();
        executor.expect_run().returning(|_| Ok(success_output()));

        let check = CommandQualityCheck::with_executor(
            executor,
            &QualityCheckConfig::default(),
            Duration::from_secs(5),
        );
        let report = check.check(Path::new("/srv/custom")).expect("report produced");

        assert_eq!(report.values().sum::<u64>(), 0);
    }

    #[rstest]
    fn missing_tool_yields_no_report() {
        let mut executor = MockCommandExecutor::new();
        executor.expect_run().returning(|call| {
            Err(ToolError::Spawn {
                program: call.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });

        let check = CommandQualityCheck::with_executor(
            executor,
            &QualityCheckConfig::default(),
            Duration::from_secs(5),
        );
        assert!(check.check(Path::new("/srv/custom")).is_none());
    }
}
