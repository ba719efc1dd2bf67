/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Command, FromArgMatches};
use std::path::PathBuf;

use fabricdb::prelude::*;

pub const COMMAND_NAME: &str = "init";

#[derive(Args, Debug)]
#[command(about = "Create a new, empty graph file.", long_about = None)]
struct CliArgs {
    /// The path of the graph file to create.
    path: PathBuf,
}

pub fn cli(command: Command) -> Command {
    command.subcommand(CliArgs::augment_args(Command::new(COMMAND_NAME)))
}

pub fn main(submatches: &ArgMatches) -> Result<()> {
    let args = CliArgs::from_arg_matches(submatches)?;
    let graph = Graph::create(&args.path)
        .with_context(|| format!("Cannot create graph file {}", args.path.display()))?;
    println!("{}", graph.header());
    Ok(())
}
