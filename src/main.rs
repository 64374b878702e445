// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod cmd;
mod conceptual;
mod config;
mod convert;
mod document;
mod error;
mod export;
mod graph;
mod json_schema;
mod schema;

use clap::Parser;
use cmd::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "merise=debug"
    } else {
        "merise=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cmd::run(cli) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
