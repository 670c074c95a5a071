mod args;
mod commands;
mod shared;

use anyhow::Result;
use clap::Parser;

use args::{AppCommand, Cli};
use commands::{run_cat, run_convert, run_example, run_ls};
use shared::logging::init_logger;

// Top-level entrypoint: parse CLI args and dispatch to a concrete command module.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    match cli.command {
        AppCommand::Convert(args) => run_convert(args),
        AppCommand::Example(args) => run_example(args),
        AppCommand::Ls(args) => run_ls(args),
        AppCommand::Cat(args) => run_cat(args),
    }
}
