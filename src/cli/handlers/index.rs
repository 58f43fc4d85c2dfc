// src/cli/handlers/index.rs

use anyhow::Result;
use colored::Colorize;

use crate::cli::args::IndexArgs;
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;

/// Indexes and registers one folder.
pub fn handle(args: IndexArgs, ctx: &Context) -> Result<()> {
    let node = ctx.workbench.index_folder(&args.path, args.kind)?;
    eprintln!(
        "{}",
        format!(
            t!("index.success.indexed"),
            path = node.path.display(),
            kind = args.kind
        )
        .green()
    );
    commons::print_output(&node, ctx.print_format)
}
