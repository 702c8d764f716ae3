//! M24Cxx image tool - Main Entry Point

use anyhow::Result;
use clap::Parser;
use m24cxx_cli::cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    cli::run(cli)
}
