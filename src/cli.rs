//! CLI argument definitions for hackcheck.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint so argument handling can be unit tested.

use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;

/// Verify vendored packages against their official releases.
#[derive(Parser, Debug, Clone)]
#[command(name = "hackcheck")]
#[command(version, about)]
#[command(long_about = concat!(
    "Verify vendored packages against their official releases.\n\n",
    "Every package descriptor under ROOT is read, the declared release is ",
    "downloaded, known patches are replayed onto it, and the result is compared ",
    "with the local copy. Each package is reported as OK, HACKED, DEV, CUSTOM, ",
    "UNKNOWN or ERROR.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Audit the contributed modules of a site:\n",
    "    $ hackcheck sites/all/modules\n\n",
    "  Show patches and modified files, including bundled sub-modules:\n",
    "    $ hackcheck -d -s sites/all/modules\n\n",
    "  Machine-readable output with four workers:\n",
    "    $ hackcheck --json -j 4 sites/all/modules",
))]
pub struct Cli {
    /// Directory to search for packages.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: Utf8PathBuf,

    /// Configuration file overriding the defaults.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Number of packages verified in parallel [default: number of CPUs].
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// List patches, modified files and failure reasons.
    #[arg(short, long)]
    pub detailed: bool,

    /// Verify and report bundled sub-packages as well.
    #[arg(short, long)]
    pub submodules: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Log level implied by the verbosity flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use hackcheck::cli::Cli;
    /// use log::LevelFilter;
    ///
    /// let cli = Cli::parse_from(["hackcheck", "-vv"]);
    /// assert_eq!(cli.log_level(), LevelFilter::Trace);
    /// ```
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
