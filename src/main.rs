//! hackcheck CLI entrypoint.
//!
//! Discovers the packages under the audit root, verifies them against their
//! official releases on a worker pool and prints the report to stdout.

use clap::Parser;
use hackcheck::cli::Cli;
use hackcheck::config::AuditConfig;
use hackcheck::discovery::discover;
use hackcheck::error::{AuditError, Result};
use hackcheck::fetch::download::HttpReleaseSource;
use hackcheck::fetch::extraction::ReleaseExtractor;
use hackcheck::patches::apply::PatchTool;
use hackcheck::pipeline::Verifier;
use hackcheck::quality::CommandQualityCheck;
use hackcheck::report::{ReportOptions, format_human, format_json};
use log::{LevelFilter, debug};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .try_init();
    if result.is_err() {
        // A logger is already installed; keep it.
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let config = AuditConfig::load(cli.config.as_deref())?;

    // Step 1: Find the packages to audit.
    let mut packages = discover(&cli.root, &config)?;
    debug!("discovered {} top-level packages under {}", packages.len(), cli.root);

    // Step 2: Verify them on a worker pool.
    let source = HttpReleaseSource::new(&config);
    let applicator = PatchTool::from_config(&config);
    let quality = config
        .quality_check
        .as_ref()
        .map(|check| CommandQualityCheck::new(check, config.tool_timeout()));
    let mut verifier = Verifier::new(&config, &source, &ReleaseExtractor, &applicator);
    if let Some(check) = &quality {
        verifier = verifier.with_quality_check(check);
    }
    let pool = build_pool(cli.jobs)?;
    pool.install(|| verifier.verify_all(&mut packages, cli.submodules));

    // Step 3: Report.
    let output = if cli.json {
        format_json(&packages, cli.submodules)
    } else {
        format_human(
            &packages,
            ReportOptions {
                detailed: cli.detailed,
                submodules: cli.submodules,
            },
        )
    };
    write_report(stdout, &output)
}

fn build_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|index| format!("hackcheck-{index}"));
    if let Some(count) = jobs {
        builder = builder.num_threads(count);
    }
    builder.build().map_err(|err| AuditError::WorkerPool {
        jobs: jobs.unwrap_or_default(),
        reason: err.to_string(),
    })
}

fn write_report(stdout: &mut dyn Write, output: &str) -> Result<()> {
    let written = if output.ends_with('\n') {
        stdout.write_all(output.as_bytes())
    } else {
        writeln!(stdout, "{output}")
    };
    written
        .and_then(|()| stdout.flush())
        .map_err(|source| AuditError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("hackcheck: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
