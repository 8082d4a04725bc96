// lpad/src/cli/list.rs
use std::collections::BTreeMap;

use clap::Args;
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_core::{get_installed_packages, InstalledPackageInfo};
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct List {
    /// Show every installed version, not only the newest per project
    #[arg(long)]
    pub all: bool,
}

impl List {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installed = get_installed_packages(config)?;
        let packages: Vec<&InstalledPackageInfo> = if self.all {
            installed.iter().collect()
        } else {
            // Registry order is ascending per project, so the last one wins.
            let mut newest: BTreeMap<&str, &InstalledPackageInfo> = BTreeMap::new();
            for pkg in &installed {
                newest.insert(pkg.project.as_str(), pkg);
            }
            newest.into_values().collect()
        };

        if packages.is_empty() {
            println!(
                "{}",
                format!("0 packages installed in {}", config.install_root().display()).yellow()
            );
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Project").style_spec("b"),
            Cell::new("Version").style_spec("b"),
            Cell::new("Link").style_spec("b"),
            Cell::new("Path").style_spec("b"),
        ]));
        for pkg in &packages {
            table.add_row(Row::new(vec![
                Cell::new(&pkg.project).style_spec("Fb"),
                Cell::new(&pkg.version),
                Cell::new(pkg.major_link.as_deref().unwrap_or("")).style_spec("Fg"),
                Cell::new(&pkg.path.display().to_string()),
            ]));
        }
        table.printstd();
        println!("{}", format!("{} packages installed", packages.len()).bold());
        Ok(())
    }
}
