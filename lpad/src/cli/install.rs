// lpad/src/cli/install.rs
use clap::Args;
use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_core::Installer;
use tracing::instrument;

use super::parse_specs;
use crate::output;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Package specs such as `nodejs.org@20` or `curl.se^8`
    #[arg(required = true)]
    specs: Vec<String>,
}

impl InstallArgs {
    #[instrument(skip(self, config), fields(specs = ?self.specs))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let requirements = parse_specs(&self.specs)?;
        if config.verbose {
            output::banner(&format!(
                "Installing {} into {}",
                self.specs.join(", "),
                config.install_root().display()
            ));
        }

        let report = Installer::new(config.clone()).install(&requirements).await?;
        output::print_report(&report, config.verbose);

        if report.has_failures() {
            return Err(LpadError::InstallError(format!(
                "{} package(s) could not be installed",
                report.failures().len()
            )));
        }
        Ok(())
    }
}
