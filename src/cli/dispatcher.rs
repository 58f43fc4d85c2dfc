// src/cli/dispatcher.rs

use anyhow::Result;

use crate::cli::Cli;
use crate::cli::args::Command;
use crate::cli::handlers;
use crate::core::workbench::Workbench;
use crate::models::PrintFormat;

/// What every handler receives: the opened profile and the output format.
#[derive(Debug)]
pub struct Context {
    /// The opened profile.
    pub workbench: Workbench,
    /// Format for structured results.
    pub print_format: PrintFormat,
}

impl Context {
    /// Opens the profile named by the global options.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let workbench = Workbench::open(cli.base_folder.as_deref(), cli.profile.as_deref())?;
        let print_format = cli
            .print_format
            .unwrap_or(workbench.config().print_format);
        log::debug!(
            "Opened profile home '{}' (print format {:?})",
            workbench.home().display(),
            print_format
        );
        Ok(Self {
            workbench,
            print_format,
        })
    }
}

/// Routes a parsed command line to its handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli)?;
    run(cli.command, &ctx)
}

/// Runs one command to completion.
pub fn run(command: Command, ctx: &Context) -> Result<()> {
    log::debug!("Dispatching {:?}", command);
    match command {
        Command::Index(args) => handlers::index::handle(args, ctx),
        Command::List(args) => handlers::tree::list(args, ctx),
        Command::Tree(args) => handlers::tree::tree(args, ctx),
        Command::Find(args) => handlers::tree::find(args, ctx),
        Command::SetName(args) => handlers::attributes::set_name(args, ctx),
        Command::SetDescription(args) => handlers::attributes::set_description(args, ctx),
        Command::SetTag(args) => handlers::attributes::set_tag(args, ctx),
        Command::DeleteTag(args) => handlers::attributes::delete_tag(args, ctx),
        Command::Assets(args) => handlers::assets::list(args, ctx),
        Command::Setup(args) => handlers::assets::setup(args, ctx),
        Command::SetParams(args) => handlers::params::set_params(args, ctx),
        Command::SaveParams(args) => handlers::params::save_params(args, ctx),
        Command::ListParams(args) => handlers::params::list_params(args, ctx),
        Command::ReadParams(args) => handlers::params::read_params(args, ctx),
        Command::DeleteParams(args) => handlers::params::delete_params(args, ctx),
        Command::Repo(command) => handlers::repo::handle(command, ctx),
        Command::Repair(args) => handlers::repair::handle(args, ctx),
    }
}
