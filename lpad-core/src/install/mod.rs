// lpad-core/src/install/mod.rs
//! Mirror-and-install engine.
//!
//! `resolve -> mirror -> link -> shelf symlinks -> stubs`, all under an
//! exclusive lock on the install root.
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use lpad_aio::fs as lpad_fs;
use lpad_aio::lock::{InstallLock, DEFAULT_LOCK_TIMEOUT};
use lpad_aio::mirror::mirror_staged;
use lpad_common::config::Config;
use lpad_common::dependency::PackageRequirement;
use lpad_common::error::{LpadError, Result};
use lpad_common::model::{EnvironmentMap, ResolvedInstallation, ResolverOutput, StubScript};
use lpad_common::pipeline::{InstallReport, PackageOutcome};
use lpad_net::{PkgxResolver, Resolve};
use tracing::{debug, error, warn};

use crate::stub::{create_stub, StubOptions, StubOutcome};

pub mod env;
pub mod link;
pub mod retry;
pub mod shelf;

pub use retry::resolve_with_retry;
pub use shelf::{select_major_targets, update_major_symlinks, SymlinkReport};

/// Installs packages into `config.install_root`.
#[derive(Debug)]
pub struct Installer<R: Resolve = PkgxResolver> {
    config: Config,
    resolver: R,
    stub_options: StubOptions,
}

impl Installer<PkgxResolver> {
    pub fn new(config: Config) -> Self {
        let resolver = PkgxResolver::new(&config);
        Self::with_resolver(config, resolver)
    }
}

impl<R: Resolve> Installer<R> {
    pub fn with_resolver(config: Config, resolver: R) -> Self {
        let stub_options = StubOptions::from_config(&config);
        Self {
            config,
            resolver,
            stub_options,
        }
    }

    pub fn with_stub_options(mut self, stub_options: StubOptions) -> Self {
        self.stub_options = stub_options;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub async fn install(&self, requirements: &[PackageRequirement]) -> Result<InstallReport> {
        if requirements.is_empty() {
            return Err(LpadError::InstallError("no packages requested".to_string()));
        }
        let root = self.config.install_root();
        lpad_fs::create_dir_all(root)?;
        let _lock = InstallLock::acquire(&self.config.lock_path(), DEFAULT_LOCK_TIMEOUT).await?;

        let specs: Vec<String> = requirements.iter().map(PackageRequirement::to_spec).collect();
        let mut report = InstallReport::default();
        let output = self.resolve(&specs, &mut report).await?;
        report.degraded = output.degraded;

        for requirement in unresolved(requirements, &output.installations) {
            let id = requirement.to_spec();
            if report.failures().iter().any(|(failed, _)| *failed == id) {
                continue;
            }
            warn!("The resolver returned nothing for {}", id);
            report.outcomes.push(PackageOutcome::Failed {
                error: LpadError::PackageNotFound(format!("{id} was not resolved")),
                id,
            });
        }
        if output.installations.is_empty() {
            error!("Nothing was resolved for [{}]", specs.join(", "));
            return Err(LpadError::NoPackagesInstalled(specs.len()));
        }

        let installations = dedupe(output.installations.clone());
        let mut pending = Vec::new();
        let mut mapping = Vec::new();
        let mut destinations = BTreeMap::new();

        for installation in &installations {
            let dest = self
                .config
                .package_path(&installation.project, &installation.version.to_string());
            mapping.push((installation.path.clone(), dest.clone()));
            destinations.insert(installation.project.clone(), dest.clone());

            if lpad_fs::check_symlink_exists(&dest) {
                if !self.config.force_reinstall {
                    debug!(
                        "{} is already installed at {}, skipping",
                        installation.id(),
                        dest.display()
                    );
                    report.outcomes.push(PackageOutcome::Skipped {
                        id: installation.id(),
                        path: dest,
                    });
                    continue;
                }
                debug!("Force reinstall: removing {}", dest.display());
                if let Err(e) = lpad_fs::remove_existing_link_target(&dest) {
                    report.outcomes.push(PackageOutcome::Failed {
                        id: installation.id(),
                        error: e,
                    });
                    continue;
                }
            }
            pending.push((installation.clone(), dest));
        }

        let mirrored = self.mirror_all(pending).await;
        let envs = env::aggregate_env(&output.env, &destinations, &mapping);
        for package_env in envs.values() {
            report.env.merge(package_env);
        }

        for (installation, dest, result) in mirrored {
            let outcome = match result {
                Ok(()) => self.finish_package(&installation, &dest, &envs),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(stubs) => {
                    debug!("Installed {} -> {}", installation.id(), dest.display());
                    report.outcomes.push(PackageOutcome::Installed {
                        id: installation.id(),
                        path: dest,
                        stubs,
                    });
                }
                Err(e) => {
                    error!("Failed to install {}: {}", installation.id(), e);
                    report.outcomes.push(PackageOutcome::Failed {
                        id: installation.id(),
                        error: e,
                    });
                }
            }
        }

        let failed = report.failures().len();
        if failed > 0 && report.installed_count() + report.skipped_count() == 0 {
            return Err(LpadError::NoPackagesInstalled(failed));
        }

        self.check_search_path();
        Ok(report)
    }

    /// Resolves every spec at once; if that fails because some spec does not
    /// exist, falls back to one query per spec so the rest still install.
    async fn resolve(&self, specs: &[String], report: &mut InstallReport) -> Result<ResolverOutput> {
        match resolve_with_retry(&self.resolver, specs, &self.config).await {
            Ok(output) => Ok(output),
            Err(LpadError::PackageNotFound(msg)) if specs.len() > 1 => {
                debug!("Batch resolve failed ({}), resolving specs one by one", msg);
                let mut merged = ResolverOutput::default();
                for spec in specs {
                    match resolve_with_retry(&self.resolver, std::slice::from_ref(spec), &self.config)
                        .await
                    {
                        Ok(output) => {
                            merged.installations.extend(output.installations);
                            for (project, env) in output.env {
                                merged
                                    .env
                                    .entry(project)
                                    .or_insert_with(EnvironmentMap::new)
                                    .merge(&env);
                            }
                            merged.degraded |= output.degraded;
                        }
                        Err(e @ LpadError::PackageNotFound(_))
                        | Err(e @ LpadError::InvalidConstraint(_)) => {
                            warn!("Could not resolve {}: {}", spec, e);
                            report.outcomes.push(PackageOutcome::Failed {
                                id: spec.clone(),
                                error: e,
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
                if merged.installations.is_empty() {
                    return Err(LpadError::NoPackagesInstalled(specs.len()));
                }
                Ok(merged)
            }
            Err(LpadError::PackageNotFound(msg)) => {
                error!("Package not found: {}", msg);
                Err(LpadError::NoPackagesInstalled(specs.len()))
            }
            Err(e) => Err(e),
        }
    }

    /// Mirrors each package on a blocking task, at most one per CPU at a time.
    async fn mirror_all(
        &self,
        pending: Vec<(ResolvedInstallation, PathBuf)>,
    ) -> Vec<(ResolvedInstallation, PathBuf, Result<()>)> {
        let workers = num_cpus::get().max(1);
        debug!("Mirroring {} package(s) with {} workers", pending.len(), workers);

        let mut results: Vec<(usize, ResolvedInstallation, PathBuf, Result<()>)> =
            stream::iter(pending.into_iter().enumerate())
                .map(|(idx, (installation, dest))| async move {
                    let src = installation.path.clone();
                    let target = dest.clone();
                    let joined =
                        tokio::task::spawn_blocking(move || mirror_staged(&src, &target)).await;
                    let result = match joined {
                        Ok(Ok(stats)) => {
                            debug!("Mirrored {}: {:?}", installation.id(), stats);
                            Ok(())
                        }
                        Ok(Err(e)) => Err(e),
                        Err(e) => Err(LpadError::InstallError(format!(
                            "mirror task for {} panicked: {e}",
                            installation.id()
                        ))),
                    };
                    (idx, installation, dest, result)
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        results.sort_by_key(|(idx, ..)| *idx);
        results
            .into_iter()
            .map(|(_, installation, dest, result)| (installation, dest, result))
            .collect()
    }

    /// Link, shelf symlinks and stubs for one freshly mirrored package.
    fn finish_package(
        &self,
        installation: &ResolvedInstallation,
        dest: &Path,
        envs: &BTreeMap<String, EnvironmentMap>,
    ) -> Result<Vec<PathBuf>> {
        if self.config.symlink_versions {
            match update_major_symlinks(dest) {
                Ok(shelf_report) => {
                    for name in &shelf_report.skipped {
                        warn!(
                            "Not updating {}/{}: occupied by a real file or directory",
                            installation.project, name
                        );
                    }
                }
                Err(e) => warn!("Could not update version links for {}: {}", installation.id(), e),
            }
        }

        if installation.project == self.config.resolver_project {
            debug!("Not linking the resolver's own package {}", installation.id());
            return Ok(Vec::new());
        }

        link::link_package_tree(dest, self.config.install_root())?;

        let env = envs.get(&installation.project).cloned().unwrap_or_default();
        let mut stubs = Vec::new();
        for (binary, stub_dir) in link::find_executables(dest, self.config.install_root()) {
            let Some(name) = binary.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            let stub = StubScript {
                binary_name: name,
                target: binary.clone(),
                env: env.clone(),
                dev_aware: self.stub_options.dev_aware,
                project: installation.project.clone(),
                version: installation.version.to_string(),
            };
            match create_stub(&stub, &stub_dir, &self.stub_options)? {
                StubOutcome::Created(path) => {
                    debug!("Created stub {}", path.display());
                    stubs.push(path);
                }
                StubOutcome::Skipped(path) => {
                    debug!("Stub {} already present", path.display());
                }
            }
        }
        Ok(stubs)
    }

    fn check_search_path(&self) {
        let bin_dir = self.config.bin_dir();
        let on_path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).any(|entry| entry == bin_dir))
            .unwrap_or(false);
        if on_path {
            return;
        }
        warn!("{} is not on your PATH", bin_dir.display());
        if self.config.auto_add_path {
            warn!(
                "Add it with: export PATH=\"{}:$PATH\"",
                bin_dir.display()
            );
        }
    }
}

/// Requested projects with no matching installation. Bare aliases such as
/// `node` are expanded by the resolver to full project names, so only
/// qualified names (`nodejs.org`, `github.com/x/y`) can be checked.
fn unresolved<'a>(
    requirements: &'a [PackageRequirement],
    installations: &[ResolvedInstallation],
) -> Vec<&'a PackageRequirement> {
    requirements
        .iter()
        .filter(|req| req.project.contains('.'))
        .filter(|req| !installations.iter().any(|i| i.project == req.project))
        .collect()
}

fn dedupe(installations: Vec<ResolvedInstallation>) -> Vec<ResolvedInstallation> {
    let mut seen = HashSet::new();
    installations
        .into_iter()
        .filter(|i| seen.insert(i.id()))
        .collect()
}
