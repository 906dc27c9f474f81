//! Postman From Source - Command-line tool for generating Postman collections.
//!
//! This binary reads the annotated route-definition files of a project (`*.server.iam.js`),
//! generates a Postman v2.1 collection from them and optionally pushes it to Postman.
//!
//! # Usage
//!
//! ```bash
//! postman-from-source [OPTIONS] <PROJECT_PATH> <COMMAND>
//! ```
//!
//! # Examples
//!
//! Print the collection:
//! ```bash
//! postman-from-source ./my-api-project generate
//! ```
//!
//! Write `<title>.postman_collection.json` into `docs/`, bypassing the cache:
//! ```bash
//! postman-from-source ./my-api-project generate --force --download -o docs
//! ```
//!
//! Replace a remote collection:
//! ```bash
//! DEVTOOLS_POSTMAN_KEY=PMAK-... postman-from-source ./my-api-project sync update <ID>
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use postman_from_source::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Postman From Source starting...");

    let args = cli::parse_args_from_parsed(args)?;

    cli::run(args)?;

    info!("Done");

    Ok(())
}
