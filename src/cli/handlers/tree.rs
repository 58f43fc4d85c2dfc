// src/cli/handlers/tree.rs

//! Handlers for the read-only query commands: `list`, `tree` and `find`.

use anyhow::Result;
use colored::Colorize;

use crate::cli::args::QueryArgs;
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;
use crate::core::filter::NodeSet;
use crate::core::tree_display;
use crate::models::Node;

/// Separator between the name chain and the folder path in `find` output.
const FIND_SEPARATOR: &str = " : ";

fn query(args: &QueryArgs, ctx: &Context) -> Result<NodeSet> {
    let filters = args.filters()?;
    Ok(ctx.workbench.query(filters)?)
}

/// Prints the matching nodes as structured records.
pub fn list(args: QueryArgs, ctx: &Context) -> Result<()> {
    let set = query(&args, ctx)?;
    let nodes: Vec<Node> = set.filtered(!args.only_matches).into_values().collect();
    commons::print_output(&nodes, ctx.print_format)
}

/// Draws the filtered tree.
pub fn tree(args: QueryArgs, ctx: &Context) -> Result<()> {
    let set = query(&args, ctx)?;
    let nodes = set.filtered(true);
    if nodes.is_empty() {
        eprintln!("{}", t!("tree.info.no_nodes").dimmed());
        return Ok(());
    }
    println!("{}", tree_display::render(&nodes));
    Ok(())
}

/// Prints one `name/name : path` line per match.
pub fn find(args: QueryArgs, ctx: &Context) -> Result<()> {
    let set = query(&args, ctx)?;
    let lines = set.filtered_paths(FIND_SEPARATOR);
    if lines.is_empty() {
        eprintln!("{}", t!("tree.info.no_nodes").dimmed());
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
