pub mod run_cli;

pub use run_cli::{Cli, Command, FormatArgs, GetArgs, LogOutputArg, PublishArgs, RunArgs};
