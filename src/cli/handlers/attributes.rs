// src/cli/handlers/attributes.rs

use anyhow::Result;

use crate::cli::args::{DeleteTagArgs, SetTagArgs, SetTextArgs};
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;

/// Handles `wb set-name`.
pub fn set_name(args: SetTextArgs, ctx: &Context) -> Result<()> {
    let record = ctx.workbench.set_name(&args.node.node_ref()?, &args.value)?;
    commons::print_output(&record, ctx.print_format)
}

/// Handles `wb set-description`.
pub fn set_description(args: SetTextArgs, ctx: &Context) -> Result<()> {
    let record = ctx
        .workbench
        .set_description(&args.node.node_ref()?, &args.value)?;
    commons::print_output(&record, ctx.print_format)
}

/// Handles `wb set-tag`.
pub fn set_tag(args: SetTagArgs, ctx: &Context) -> Result<()> {
    let record = ctx
        .workbench
        .set_tag(&args.node.node_ref()?, &args.key, &args.value)?;
    commons::print_output(&record, ctx.print_format)
}

/// Deleting a tag that is not set leaves the record as it was.
pub fn delete_tag(args: DeleteTagArgs, ctx: &Context) -> Result<()> {
    let record = ctx.workbench.delete_tag(&args.node.node_ref()?, &args.key)?;
    commons::print_output(&record, ctx.print_format)
}
