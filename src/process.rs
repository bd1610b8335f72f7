//! External process execution with timeouts.
//!
//! The patch tool and the quality check are both external programs. They run
//! through the [`CommandExecutor`] trait so tests can substitute canned
//! output, and the system implementation enforces a timeout so a hung tool
//! cannot stall a worker forever.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// File streamed to the program's standard input, if any.
    pub stdin: Option<PathBuf>,
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
}

/// Errors raised while running an external command.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started.
    #[error("cannot run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("{program} timed out after {seconds} seconds")]
    TimedOut {
        /// Program that timed out.
        program: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// I/O failed while feeding or draining the program.
    #[error("I/O error talking to {program}: {source}")]
    Io {
        /// Program being driven.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs `invocation` to completion and returns its captured output.
    ///
    /// A non-zero exit status is not an error; callers inspect
    /// `Output::status` themselves.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if the program cannot start, times out, or its
    /// streams cannot be read.
    fn run(&self, invocation: &Invocation) -> Result<Output, ToolError>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output, ToolError> {
        let program = invocation.program.as_str();
        let io_error = |source| ToolError::Io {
            program: program.to_owned(),
            source,
        };

        let stdin = match &invocation.stdin {
            Some(path) => Stdio::from(File::open(path).map_err(io_error)?),
            None => Stdio::null(),
        };

        let mut child = Command::new(program)
            .args(&invocation.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty tool cannot block on a
        // full pipe while we wait for it to exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let Some(status) = child.wait_timeout(invocation.timeout).map_err(io_error)? else {
            kill(&mut child);
            return Err(ToolError::TimedOut {
                program: program.to_owned(),
                seconds: invocation.timeout.as_secs(),
            });
        };

        Ok(Output {
            status,
            stdout: collect(stdout).map_err(io_error)?,
            stderr: collect(stderr).map_err(io_error)?,
        })
    }
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain(pipe: Option<impl Read + Send + 'static>) -> Drain {
    pipe.map(|mut reader| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn collect(handle: Drain) -> std::io::Result<Vec<u8>> {
    match handle {
        Some(thread) => thread
            .join()
            .map_err(|_| std::io::Error::other("pipe reader panicked"))?,
        None => Ok(Vec::new()),
    }
}

fn kill(child: &mut Child) {
    if child.kill().is_err() {
        log::debug!("process {} already exited before kill", child.id());
    }
    if child.wait().is_err() {
        log::debug!("failed to reap process {}", child.id());
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> Invocation {
        Invocation {
            program: program.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            stdin: None,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn captures_stdout_and_exit_status() {
        let output = SystemCommandExecutor
            .run(&invocation("sh", &["-c", "echo hello; exit 3"]))
            .expect("sh runs");

        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn feeds_stdin_from_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let input = temp.path().join("input.txt");
        std::fs::write(&input, "piped content\n").expect("write input");

        let mut call = invocation("cat", &[]);
        call.stdin = Some(input);
        let output = SystemCommandExecutor.run(&call).expect("cat runs");

        assert_eq!(output.stdout, b"piped content\n");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = SystemCommandExecutor
            .run(&invocation("hackcheck-no-such-program", &[]))
            .expect_err("program does not exist");
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[test]
    fn slow_program_times_out() {
        let mut call = invocation("sleep", &["5"]);
        call.timeout = Duration::from_millis(100);

        let err = SystemCommandExecutor.run(&call).expect_err("sleep exceeds timeout");
        assert!(matches!(err, ToolError::TimedOut { .. }));
    }
}
