// lpad/src/cli/env.rs
//! `lpad env ...`: per-project environments and the shell hook contract.
use std::env as std_env;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_core::environment::{
    deactivation_script, health_of, should_deactivate, ACTIVE_DIR_VAR, ACTIVE_VARS_VAR,
};
use lpad_core::EnvironmentManager;
use prettytable::{format, Cell, Row, Table};
use tracing::{debug, instrument};

use super::parse_specs;
use crate::output;

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Print the environment hash of a directory
    Hash(DirArg),
    /// Install packages into a directory's environment, creating it if needed
    Ensure(EnsureArgs),
    /// Show every environment and its health
    List(ListArgs),
    /// Delete an environment by hash
    Remove { hash: String },
    /// Print shell code that activates a directory's environment
    Activate(DirArg),
    /// Print shell code that undoes the current activation
    Deactivate(DeactivateArgs),
    /// Delete environments without binaries or packages
    Clean,
}

#[derive(Args, Debug)]
pub struct DirArg {
    /// Project directory (defaults to the current directory)
    dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EnsureArgs {
    dir: PathBuf,
    #[arg(required = true)]
    specs: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct DeactivateArgs {
    /// Only deactivate when the current directory left the active project
    #[arg(long)]
    if_left: bool,
}

impl EnvCommand {
    #[instrument(skip(self, config))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let manager = EnvironmentManager::new(config.clone());
        match self {
            Self::Hash(arg) => {
                println!("{}", manager.hash(&arg.resolve()?)?);
                Ok(())
            }
            Self::Ensure(args) => ensure(&manager, args, config.verbose).await,
            Self::List(args) => list(&manager, args.json),
            Self::Remove { hash } => {
                manager.remove(hash)?;
                println!("{}", format!("Removed environment {hash}").bold());
                Ok(())
            }
            Self::Activate(arg) => {
                print!("{}", manager.activation(&arg.resolve()?)?);
                Ok(())
            }
            Self::Deactivate(args) => {
                deactivate(args.if_left);
                Ok(())
            }
            Self::Clean => {
                let removed = manager.clean()?;
                for hash in &removed {
                    println!("{hash}");
                }
                println!(
                    "{}",
                    format!("{} unhealthy environment(s) removed", removed.len()).bold()
                );
                Ok(())
            }
        }
    }
}

impl DirArg {
    fn resolve(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std_env::current_dir()?),
        }
    }
}

async fn ensure(manager: &EnvironmentManager, args: &EnsureArgs, verbose: bool) -> Result<()> {
    let requirements = parse_specs(&args.specs)?;
    if verbose {
        output::banner(&format!(
            "Ensuring {} for {}",
            args.specs.join(", "),
            args.dir.display()
        ));
    }
    let (env, report) = manager.ensure(&args.dir, &requirements).await?;
    output::print_report(&report, verbose);
    println!("{}", env.root_path.display());

    if report.has_failures() {
        return Err(LpadError::InstallError(format!(
            "{} package(s) could not be installed into {}",
            report.failures().len(),
            env.hash
        )));
    }
    Ok(())
}

fn list(manager: &EnvironmentManager, json: bool) -> Result<()> {
    let envs = manager.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&envs)?);
        return Ok(());
    }
    if envs.is_empty() {
        println!(
            "{}",
            format!("No environments in {}", manager.base_dir().display()).yellow()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(Row::new(vec![
        Cell::new("Hash").style_spec("b"),
        Cell::new("Project").style_spec("b"),
        Cell::new("Packages").style_spec("b"),
        Cell::new("Health").style_spec("b"),
        Cell::new("Created").style_spec("b"),
    ]));
    for env in &envs {
        let health = health_of(&env.root_path);
        let health_cell = if health.is_healthy() {
            Cell::new("ok").style_spec("Fg")
        } else if !health.has_packages {
            Cell::new("no packages").style_spec("Fr")
        } else {
            Cell::new("no binaries").style_spec("Fy")
        };
        let project = env
            .project_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(Row::new(vec![
            Cell::new(&env.hash).style_spec("Fb"),
            Cell::new(&project),
            Cell::new(&env.packages.len().to_string()),
            health_cell,
            Cell::new(&env.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }
    table.printstd();
    println!("{}", format!("{} environment(s)", envs.len()).bold());
    Ok(())
}

fn deactivate(if_left: bool) {
    let Some(active_dir) = std_env::var_os(ACTIVE_DIR_VAR) else {
        debug!("No active environment");
        return;
    };
    if if_left {
        let still_inside = std_env::current_dir()
            .map(|cwd| !should_deactivate(&cwd, Path::new(&active_dir)))
            .unwrap_or(false);
        if still_inside {
            return;
        }
    }
    let active_vars = std_env::var(ACTIVE_VARS_VAR).unwrap_or_default();
    print!("{}", deactivation_script(&active_vars));
}
