//! # Parse-Path Subcommand
//!
//! Prints the identity each sample location encodes, so corpus authors can
//! check a file is where the harness expects it.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use sdv_core::parse_sample_location;

use crate::{EXIT_FATAL, EXIT_SUCCESS};

/// Arguments for the `sdv parse-path` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ParsePathArgs {
    /// Sample locations (paths or URIs).
    #[arg(value_name = "LOCATION", required = true)]
    pub locations: Vec<String>,
}

/// Returns exit code: 0 if every location parses, 2 if any is malformed.
pub fn run_parse_path(args: &ParsePathArgs, out: &mut dyn Write) -> Result<u8> {
    let mut malformed = 0usize;
    for location in &args.locations {
        match parse_sample_location(location) {
            Ok(p) => {
                let id = p.identity();
                writeln!(out, "OK: {location}")?;
                writeln!(out, "  namespace: {}", id.namespace())?;
                writeln!(out, "  name:      {}", id.name())?;
                writeln!(out, "  version:   {}", id.version())?;
                writeln!(out, "  expected:  {}", p.expected())?;
                writeln!(out, "  sample:    {}", p.sample_name())?;
            }
            Err(e) => {
                malformed += 1;
                writeln!(out, "MALFORMED: {location}: {}", e.reason)?;
            }
        }
    }

    if malformed > 0 {
        tracing::warn!(malformed, "malformed sample locations");
        Ok(EXIT_FATAL)
    } else {
        Ok(EXIT_SUCCESS)
    }
}
