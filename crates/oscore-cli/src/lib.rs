// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::Subcommand;
use oscore_logging::CliLoggingArgs;

pub mod commands;

pub use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(
    name = "oscore",
    about = "Path resolution, descriptor-remapping exec and descriptor waits",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expand, absolutize and canonicalize path strings
    Resolve(commands::path::ResolveArgs),
    /// Print the last component of a path
    Basename(commands::path::ComponentArgs),
    /// Print everything before the last component of a path
    Dirname(commands::path::ComponentArgs),
    /// Replace this process with a program after remapping descriptors
    Exec(commands::exec::ExecArgs),
    /// Wait until descriptors become ready
    Wait(commands::wait::WaitArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Resolve(args) => args.run(),
            Commands::Basename(args) => args.run_basename(),
            Commands::Dirname(args) => args.run_dirname(),
            Commands::Exec(args) => args.run(),
            Commands::Wait(args) => args.run(),
        }
    }
}
