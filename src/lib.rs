//! hackcheck library.
//!
//! Verifies that third-party packages vendored into a codebase still match
//! their official releases. Each package's declared release is downloaded,
//! any recorded patches are replayed onto it, and the result is compared file
//! by file with the local copy. The `hackcheck` binary wraps this library;
//! tests drive it directly with stub collaborators.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`compare`] - Recursive directory comparison
//! - [`config`] - TOML configuration with drupal.org defaults
//! - [`descriptor`] - Descriptor attribute extraction
//! - [`discovery`] - Package discovery beneath an audit root
//! - [`error`] - Run-level error types
//! - [`fetch`] - Pristine release download and extraction
//! - [`package`] - The package entity and verification statuses
//! - [`patches`] - Patch discovery and replay
//! - [`pipeline`] - Per-package verification and classification
//! - [`process`] - External process execution with timeouts
//! - [`quality`] - Static-analysis report for custom packages
//! - [`report`] - Human-readable and JSON report formatting

pub mod cli;
pub mod compare;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod package;
pub mod patches;
pub mod pipeline;
pub mod process;
pub mod quality;
pub mod report;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
