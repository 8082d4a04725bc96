// lpad/src/cli/shim.rs
use clap::Args;
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_core::{create_shims, StubOptions};
use lpad_net::PkgxResolver;
use tracing::instrument;

use super::parse_specs;
use crate::output;

#[derive(Debug, Args)]
pub struct ShimArgs {
    /// Package specs to expose without mirroring them
    #[arg(required = true)]
    specs: Vec<String>,
}

impl ShimArgs {
    #[instrument(skip(self, config), fields(specs = ?self.specs))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let requirements = parse_specs(&self.specs)?;
        if config.verbose {
            output::banner(&format!(
                "Writing shims for {} into {}",
                self.specs.join(", "),
                config.shim_dir.display()
            ));
        }

        let resolver = PkgxResolver::new(config);
        let options = StubOptions::from_config(config);
        let shims = create_shims(config, &resolver, &requirements, &options).await?;

        output::print_paths(&shims);
        println!("{}", format!("{} shim(s) written", shims.len()).bold());
        Ok(())
    }
}
