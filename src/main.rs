// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod cmd;
mod config;
mod error;
mod input;
mod parser;
mod restore;
mod schema;

use clap::Parser;
use cmd::Cli;
use error::RestoreError;

fn main() {
    let cli = Cli::parse();
    cmd::init_logging(cli.verbose);

    if let Err(e) = cmd::run(cli) {
        eprintln!("error: {e:#}");
        let code = e
            .downcast_ref::<RestoreError>()
            .map(RestoreError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
