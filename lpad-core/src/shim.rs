// lpad-core/src/shim.rs
//! `shim`: stubs that run packages straight out of the resolver's own store.
//! Nothing is mirrored; the stubs point at the resolved paths.
use std::path::PathBuf;

use lpad_common::config::Config;
use lpad_common::dependency::PackageRequirement;
use lpad_common::error::{LpadError, Result};
use lpad_common::model::StubScript;
use lpad_net::Resolve;
use tracing::{debug, warn};

use crate::install::link::find_executables;
use crate::install::resolve_with_retry;
use crate::stub::{create_stub, StubOptions, StubOutcome};

pub async fn create_shims<R: Resolve>(
    config: &Config,
    resolver: &R,
    requirements: &[PackageRequirement],
    stub_options: &StubOptions,
) -> Result<Vec<PathBuf>> {
    let specs: Vec<String> = requirements.iter().map(PackageRequirement::to_spec).collect();
    let output = resolve_with_retry(resolver, &specs, config).await?;
    if output.installations.is_empty() {
        return Err(LpadError::NoPackagesInstalled(specs.len()));
    }

    let shim_dir = &config.shim_dir;
    let mut created = Vec::new();
    for installation in &output.installations {
        if installation.project == config.resolver_project {
            continue;
        }
        if !installation.path.is_dir() {
            warn!(
                "{} resolved to missing {}, no shims",
                installation.id(),
                installation.path.display()
            );
            continue;
        }
        let mut env = output.env_for(&installation.project);
        let bin = installation.path.join("bin");
        if bin.is_dir() {
            let bin = bin.to_string_lossy().to_string();
            env.prepend_entries("PATH", &[bin.as_str()]);
        }

        for (binary, _) in find_executables(&installation.path, shim_dir) {
            let Some(name) = binary.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            let stub = StubScript {
                binary_name: name,
                target: binary.clone(),
                env: env.clone(),
                dev_aware: stub_options.dev_aware,
                project: installation.project.clone(),
                version: installation.version.to_string(),
            };
            match create_stub(&stub, shim_dir, stub_options)? {
                StubOutcome::Created(path) => {
                    debug!("Created shim {}", path.display());
                    created.push(path);
                }
                StubOutcome::Skipped(path) => debug!("Shim {} already present", path.display()),
            }
        }
    }
    Ok(created)
}
