//! # filebase CLI
//!
//! Command-line access to a filebase store: keyed JSON values in one
//! document, versioned with git.
//!
//! Run `filebase --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
