// lpad/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use lpad_common::config::Config;
use lpad_common::dependency::PackageRequirement;
use lpad_common::error::Result;

pub mod env;
pub mod install;
pub mod list;
pub mod shim;

use crate::cli::env::EnvCommand;
use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::shim::ShimArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "lpad", bin_name = "lpad")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Install root (for `shim`, the stub directory) instead of the configured one
    #[arg(long, global = true, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Reinstall packages that are already present and overwrite stubs
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Lets command-line flags win over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        config.verbose = self.verbose > 0;
        if self.force {
            config.force_reinstall = true;
        }
        if let Some(path) = &self.path {
            match self.command {
                Command::Shim(_) => config.shim_dir = path.clone(),
                _ => config.install_root = path.clone(),
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mirror packages into the install root and write stubs for them
    Install(InstallArgs),
    /// Write stubs that run packages straight from the resolver's store
    Shim(ShimArgs),
    /// Show packages installed under the install root
    List(List),
    /// Manage per-project environments
    #[command(subcommand)]
    Env(EnvCommand),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Shim(command) => command.run(config).await,
            Self::List(command) => command.run(config),
            Self::Env(command) => command.run(config).await,
        }
    }
}

pub(crate) fn parse_specs(specs: &[String]) -> Result<Vec<PackageRequirement>> {
    specs.iter().map(|s| PackageRequirement::parse(s)).collect()
}
