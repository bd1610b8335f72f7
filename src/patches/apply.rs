//! Best-effort patch application.
//!
//! Recorded patches were made against whatever base the maintainer had at
//! the time, so they may not apply to the declared release. A failed
//! application is recorded but never aborts verification: whatever the patch
//! failed to reproduce shows up as a differing file instead.

use std::path::Path;
use std::time::Duration;

use log::debug;

use super::ApplyOutcome;
use crate::config::AuditConfig;
use crate::process::{CommandExecutor, Invocation, SystemCommandExecutor};

/// Applies a single patch file to a directory tree.
#[cfg_attr(test, mockall::automock)]
pub trait PatchApplicator {
    /// Apply `patch` to the tree rooted at `target_dir`.
    fn apply(&self, target_dir: &Path, patch: &Path) -> ApplyOutcome;
}

/// Applies patches by running an external `patch`-compatible program.
///
/// The tree is addressed with `-d <dir>` and the patch is streamed on
/// standard input, so the process working directory is never touched.
#[derive(Debug, Clone)]
pub struct PatchTool<E = SystemCommandExecutor> {
    executor: E,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PatchTool {
    /// Build a patch tool on the host system from `config`.
    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::with_executor(SystemCommandExecutor, config)
    }
}

impl<E: CommandExecutor> PatchTool<E> {
    /// Build a patch tool that runs through `executor`.
    #[must_use]
    pub fn with_executor(executor: E, config: &AuditConfig) -> Self {
        Self {
            executor,
            program: config.patch_program.clone(),
            args: config.patch_args.clone(),
            timeout: config.tool_timeout(),
        }
    }

    fn invocation(&self, target_dir: &Path, patch: &Path) -> Invocation {
        let mut args = self.args.clone();
        args.push("-d".to_owned());
        args.push(target_dir.display().to_string());
        Invocation {
            program: self.program.clone(),
            args,
            stdin: Some(patch.to_path_buf()),
            timeout: self.timeout,
        }
    }
}

impl<E: CommandExecutor> PatchApplicator for PatchTool<E> {
    fn apply(&self, target_dir: &Path, patch: &Path) -> ApplyOutcome {
        let outcome = match self.executor.run(&self.invocation(target_dir, patch)) {
            Ok(output) if output.status.success() => ApplyOutcome::Applied,
            Ok(output) => ApplyOutcome::Rejected {
                code: output.status.code(),
                detail: first_line(&output.stderr)
                    .or_else(|| first_line(&output.stdout))
                    .unwrap_or_default(),
            },
            Err(err) => ApplyOutcome::ToolUnavailable {
                detail: err.to_string(),
            },
        };
        debug!("patch {}: {outcome}", patch.display());
        outcome
    }
}

fn first_line(stream: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stream)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}
