// src/cli/handlers/params.rs

//! Handlers for dataset parameters and saved parameter sets.

use anyhow::Result;
use colored::Colorize;

use crate::cli::args::{
    AssetParamsArgs, DeleteParamsArgs, NamedParamsArgs, SaveParamsArgs, SetParamsArgs,
    collect_params,
};
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;

/// Validates parameters and writes them into a dataset.
pub fn set_params(args: SetParamsArgs, ctx: &Context) -> Result<()> {
    let node = args.node.node_ref()?;
    let values = collect_params(&args.params);
    let params = ctx.workbench.set_params(
        &node,
        args.kind,
        values,
        args.from.as_deref(),
        args.overwrite,
    )?;
    commons::print_output(&params, ctx.print_format)
}

/// Handles `wb save-params`.
pub fn save_params(args: SaveParamsArgs, ctx: &Context) -> Result<()> {
    let node = args.node.node_ref()?;
    let path = ctx
        .workbench
        .save_params_from_dataset(&node, args.kind, &args.name, args.overwrite)?;
    eprintln!(
        "{}",
        format!(
            t!("params.success.saved"),
            name = args.name.cyan(),
            path = path.display()
        )
        .green()
    );
    Ok(())
}

/// Prints the names of the saved sets of an asset.
pub fn list_params(args: AssetParamsArgs, ctx: &Context) -> Result<()> {
    let names = ctx.workbench.saved_params().list(args.kind, &args.asset)?;
    commons::print_output(&names, ctx.print_format)
}

/// Handles `wb read-params`.
pub fn read_params(args: NamedParamsArgs, ctx: &Context) -> Result<()> {
    let params = ctx
        .workbench
        .saved_params()
        .load(args.asset.kind, &args.asset.asset, &args.name)?;
    commons::print_output(&params, ctx.print_format)
}

/// Deletes a saved set after confirmation.
pub fn delete_params(args: DeleteParamsArgs, ctx: &Context) -> Result<()> {
    let DeleteParamsArgs { target, yes } = args;
    let store = ctx.workbench.saved_params();
    // Fails with NotFound before anything is asked.
    store.load(target.asset.kind, &target.asset.asset, &target.name)?;

    let prompt = format!(
        t!("params.prompt.delete"),
        name = target.name,
        kind = target.asset.kind,
        asset = target.asset.asset
    );
    if !commons::confirm(&prompt, yes)? {
        return Ok(());
    }
    store.delete(target.asset.kind, &target.asset.asset, &target.name)?;
    eprintln!(
        "{}",
        format!(t!("params.success.deleted"), name = target.name.cyan()).green()
    );
    Ok(())
}
