// src/cli/handlers/repair.rs

//! Handler for `wb repair`.
//!
//! Walks a folder tree looking for `._wb/index.json` records and registers
//! the folders the registry does not reach, e.g. after a folder was moved or
//! a registry entry was pruned. Records are never modified.

use anyhow::Result;
use colored::Colorize;
use std::env;

use crate::cli::args::RepairArgs;
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;

/// Registers the unreachable indexed folders below a path.
pub fn handle(args: RepairArgs, ctx: &Context) -> Result<()> {
    let start_path = match args.path {
        Some(path) => path,
        None => env::current_dir()?,
    };
    eprintln!(
        "{}",
        format!(t!("repair.info.starting_scan"), path = start_path.display()).bold()
    );

    let registered = ctx.workbench.repair(&start_path)?;
    if registered.is_empty() {
        eprintln!("{}", t!("repair.success.no_issues").green());
    } else {
        eprintln!(
            "{}",
            format!(t!("repair.success.registered"), count = registered.len()).green()
        );
    }
    commons::print_output(&registered, ctx.print_format)
}
