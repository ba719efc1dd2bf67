/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Command, FromArgMatches};
use std::path::PathBuf;

use fabricdb::prelude::*;

pub const COMMAND_NAME: &str = "classes";

#[derive(Args, Debug)]
#[command(about = "Print the class hierarchy of a graph file.", long_about = None)]
struct CliArgs {
    /// The path of the graph file to inspect.
    path: PathBuf,
}

pub fn cli(command: Command) -> Command {
    command.subcommand(CliArgs::augment_args(Command::new(COMMAND_NAME)))
}

pub fn main(submatches: &ArgMatches) -> Result<()> {
    let args = CliArgs::from_arg_matches(submatches)?;
    let mut graph = Graph::open(&args.path)
        .with_context(|| format!("Cannot open graph file {}", args.path.display()))?;
    print_subtree(&mut graph, ROOT_CLASS_ID, 0)?;
    Ok(())
}

fn print_subtree(graph: &mut Graph, class_id: ClassId, indent: usize) -> Result<()> {
    let name = graph.class_name(class_id)?;
    let class = graph.class(class_id)?;
    let members = class.count();
    let marker = if class.is_abstract() { " (abstract)" } else { "" };
    println!("{:indent$}{name} [{class_id}]{marker}: {members} members", "");
    let children = graph.child_classes(class_id)?;
    for &child in &children {
        print_subtree(graph, child, indent + 2)?;
    }
    Ok(())
}
