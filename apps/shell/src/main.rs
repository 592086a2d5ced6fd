#![allow(clippy::print_stdout)]

mod args;
mod commands;

use crate::args::{Cli, Command};
use anyhow::Result;
use arbor_logger::Logger;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = Logger::builder().console(cli.log_format.into()).level(cli.log_level);
    if let Some(path) = &cli.log_file {
        logger = logger.file(path);
    }
    let _logger = logger.init()?;

    match cli.command {
        Command::Types { registry } => commands::types(&registry)?,
        Command::Eval(args) => commands::eval(args)?,
    }

    Ok(())
}
