//! actiongraph CLI
//!
//! ## Usage
//!
//! ```bash
//! actiongraph build scenarios/ --compile           # scenario files → graphs → artifacts
//! actiongraph compile auth -s "User logs in"      # stored graph → .feature + _steps.rs
//! actiongraph replay auth --snapshot dom.json     # run a graph against a DOM snapshot
//! actiongraph drift --snapshot dom.json --apply   # detect and merge selector drift
//! ```

use actiongraph_cli::Cli;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match actiongraph_cli::run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
