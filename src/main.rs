//! `apidoc-synth` - command-line front end of the document synthesizer.
//!
//! Loads an endpoint manifest, optionally collects payload types from a Rust source tree,
//! runs one generation pass and prints or writes the resulting OpenAPI document.
//!
//! # Usage
//!
//! ```bash
//! apidoc-synth [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Generate YAML using the types declared under `./src`:
//! ```bash
//! apidoc-synth api.yaml -s ./src -o openapi.yaml
//! ```
//!
//! Generate JSON with a different title:
//! ```bash
//! apidoc-synth api.yaml -f json --title "Todo API" -o openapi.json
//! ```

use anyhow::Result;
use apidoc_synth::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("API document generation completed");
    Ok(())
}
