use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "hlb")]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Build daemon endpoint.
    #[arg(long, global = true)]
    pub addr: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub log_output: LogOutputArg,

    /// Attach the interactive debugger.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print full codegen backtraces.
    #[arg(long, global = true)]
    pub backtrace: bool,

    /// Print the emitted graph as a tree instead of a definition.
    #[arg(long, global = true)]
    pub tree: bool,

    /// Path to an hlb.toml config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutputArg {
    Auto,
    Tty,
    Plain,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse, check, and generate a build graph for each target.
    Run(RunArgs),
    /// Wrap a program as a frontend image and push it.
    Publish(PublishArgs),
    /// Fetch the signature file from a published frontend image.
    Get(GetArgs),
    /// Rewrite source with canonical spacing.
    Format(FormatArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Program path; stdin when omitted.
    pub path: Option<PathBuf>,

    #[arg(long, default_value = "default")]
    pub target: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    pub path: PathBuf,

    #[arg(long)]
    pub target: String,

    #[arg(long = "ref")]
    pub reference: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub image_ref: String,
}

#[derive(Args, Debug)]
pub struct FormatArgs {
    pub path: PathBuf,
}
