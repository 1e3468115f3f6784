//! # sdv-cli — Sample-Data Conformance CLI
//!
//! Provides the `sdv` command-line interface.
//!
//! ## Subcommands
//!
//! - `sdv run` — Check every sample under the sample root against the
//!   schema corpus and report mismatches.
//! - `sdv parse-path` — Show the identity a sample location encodes.
//!
//! ```bash
//! sdv run --schema-root schema --sample-root test-data
//! sdv -v run --match-mode minor-compatible --format json
//! sdv parse-path test-data/omh/blood-pressure/1.0/shouldPass/example-1.json
//! ```
//!
//! ## Exit Status
//!
//! `0` when every sample matches its expectation and every file loaded,
//! `1` on any conformance failure, `2` when the run could not complete.

pub mod parse_path;
pub mod render;
pub mod run;

/// Every file loaded and every outcome matched.
pub const EXIT_SUCCESS: u8 = 0;
/// The run completed but found mismatches, missing schemas, engine errors
/// or unloadable files.
pub const EXIT_FAILURE: u8 = 1;
/// The run could not complete.
pub const EXIT_FATAL: u8 = 2;
