use crate::models::PrintFormat;
use clap::{ArgAction, Parser};

/// Argument structs for every subcommand.
pub mod args;
/// Routes a parsed command to its handler.
pub mod dispatcher;
/// One function per command.
pub mod handlers;

/// Builds the color-aware help string at runtime.
fn build_help_string() -> &'static str {
    // Replaces placeholders like `<title>` in the help template with ANSI styles.
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let template = t!("cli.help.template");

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let group = if use_colors { "\x1b[1;32m" } else { "" }; // Bold Green
    let err = if use_colors { "\x1b[91m" } else { "" }; // Bright Red (destructive)
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let formatted_string = template
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<group>", group)
        .replace("</group>", reset)
        .replace("<err>", err)
        .replace("</err>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(formatted_string.into_boxed_str())
}

/// wb: index analysis folders into a queryable tree of datasets and collections.
#[derive(Parser, Debug)]
#[command(
    name = "wb",
    author,
    version,
    about,
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Folder holding every profile. Defaults to `~/._workbench`.
    #[arg(long, global = true, env = "WB_BASE", value_name = "DIR")]
    pub base_folder: Option<String>,

    /// Profile folder inside the base folder. Defaults to `default`.
    #[arg(long, global = true, env = "WB_PROFILE", value_name = "NAME")]
    pub profile: Option<String>,

    /// Output format for structured results, overriding the profile config.
    #[arg(long, global = true, value_name = "json|yaml")]
    pub print_format: Option<PrintFormat>,

    /// Increase log verbosity (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// The command to run.
    #[command(subcommand)]
    pub command: args::Command,
}
