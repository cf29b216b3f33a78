//! A monochrome emoji font assembler built with Rust and Linebender crates.
//!
//! Scans a directory of per-codepoint SVG outlines, resolves every valid
//! emoji sequence to a glyph or ligature, and assembles the result into a
//! font via UFO and `fontc`.

use anyhow::Result;
use monomoji::core;

/// Run the batch build with the given CLI arguments.
fn run_app(cli_args: core::cli::CliArgs) -> Result<()> {
    core::app::run(cli_args)
}

fn main() {
    monomoji::logging::init();
    let cli_args = core::cli::parse_args();
    match run_app(cli_args) {
        Ok(()) => {}
        Err(error) => core::cli::handle_error(error),
    }
}
