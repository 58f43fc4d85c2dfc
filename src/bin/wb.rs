// src/bin/wb.rs

//! The `wb` executable.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use workbench::cli::{Cli, dispatcher};

/// Log filter for a `-v` count, used unless `RUST_LOG` is set.
fn default_log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(cli.verbose)),
    )
    .init();

    if let Err(e) = run_cli(cli) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);
    dispatcher::dispatch(cli)
}
