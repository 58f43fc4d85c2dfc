// src/cli/handlers/repo.rs

use anyhow::{Result, anyhow};
use colored::Colorize;

use crate::cli::args::{RepoCommand, RepoLinkArgs, RepoUnlinkArgs};
use crate::cli::dispatcher::Context;
use crate::cli::handlers::commons;
use crate::core::{assets, paths};

/// Handles the `wb repo` subcommands.
pub fn handle(command: RepoCommand, ctx: &Context) -> Result<()> {
    match command {
        RepoCommand::List => list(ctx),
        RepoCommand::Link(args) => link(args, ctx),
        RepoCommand::Unlink(args) => unlink(args, ctx),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let repositories = assets::list_repositories(&ctx.workbench.repositories_dir())?;
    commons::print_output(&repositories, ctx.print_format)
}

fn link(args: RepoLinkArgs, ctx: &Context) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => paths::sanitize(&args.path)?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!(t!("repo.error.no_name")))?,
    };
    let repository =
        assets::link_repository(&ctx.workbench.repositories_dir(), &args.path, &name)?;
    commons::print_output(&repository, ctx.print_format)
}

fn unlink(args: RepoUnlinkArgs, ctx: &Context) -> Result<()> {
    let prompt = format!(t!("repo.prompt.unlink"), name = args.name);
    if !commons::confirm(&prompt, args.yes)? {
        return Ok(());
    }
    assets::unlink_repository(&ctx.workbench.repositories_dir(), &args.name)?;
    eprintln!(
        "{}",
        format!(t!("repo.success.unlinked"), name = args.name.cyan()).green()
    );
    Ok(())
}
