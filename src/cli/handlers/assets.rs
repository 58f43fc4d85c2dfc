// src/cli/handlers/assets.rs

use anyhow::Result;
use colored::Colorize;

use crate::cli::args::{AssetsArgs, SetupArgs};
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;
use crate::core::assets::Asset;

/// Lists the assets of one kind, by `repo/key` reference or in full with `--long`.
pub fn list(args: AssetsArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.workbench.catalog()?;
    if args.long {
        let assets: Vec<&Asset> = catalog.assets(args.kind).collect();
        commons::print_output(&assets, ctx.print_format)
    } else {
        commons::print_output(&catalog.list(args.kind), ctx.print_format)
    }
}

/// Copies the chosen tool and launcher into a dataset.
pub fn setup(args: SetupArgs, ctx: &Context) -> Result<()> {
    let node = args.node.node_ref()?;
    let record = ctx.workbench.setup(
        &node,
        &args.tool,
        args.launcher.as_deref(),
        args.overwrite,
    )?;
    eprintln!(
        "{}",
        format!(t!("setup.success.done"), name = record.name.cyan()).green()
    );
    commons::print_output(&record, ctx.print_format)
}
