/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Command, FromArgMatches};
use std::path::PathBuf;

use fabricdb::prelude::*;

pub const COMMAND_NAME: &str = "info";

#[derive(Args, Debug)]
#[command(about = "Print the header of a graph file.", long_about = None)]
struct CliArgs {
    /// The path of the graph file to inspect.
    path: PathBuf,
}

pub fn cli(command: Command) -> Command {
    command.subcommand(CliArgs::augment_args(Command::new(COMMAND_NAME)))
}

pub fn main(submatches: &ArgMatches) -> Result<()> {
    let args = CliArgs::from_arg_matches(submatches)?;
    let graph = Graph::open(&args.path)
        .with_context(|| format!("Cannot open graph file {}", args.path.display()))?;
    println!("{}", graph.header());
    println!("Live Classes: {}", graph.class_count());
    println!("Live Labels: {}", graph.label_count());
    println!("Live Vertices: {}", graph.vertex_count());
    println!("Live Edges: {}", graph.edge_count());
    println!("Live Properties: {}", graph.property_count());
    Ok(())
}
