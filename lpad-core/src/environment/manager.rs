// lpad-core/src/environment/manager.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lpad_aio::fs as lpad_fs;
use lpad_aio::json_io::{read_json, write_json};
use lpad_common::config::Config;
use lpad_common::dependency::PackageRequirement;
use lpad_common::error::{LpadError, Result};
use lpad_common::installed::PackageRegistry;
use lpad_common::model::{EnvironmentHealth, EnvironmentMetadata, ProjectEnvironment};
use lpad_common::pipeline::InstallReport;
use lpad_net::{PkgxResolver, Resolve};
use tracing::{debug, warn};

use super::activation::activation_script;
use super::hash::{hash_dir, project_hash};
use crate::install::Installer;

pub const METADATA_FILE: &str = ".lpad-env.json";

/// Owns the per-project install trees under `config.envs_dir`.
#[derive(Debug, Clone)]
pub struct EnvironmentManager {
    config: Config,
}

impl EnvironmentManager {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.envs_dir
    }

    pub fn hash(&self, dir: &Path) -> Result<String> {
        Ok(hash_dir(dir)?.1)
    }

    pub fn root_for_hash(&self, hash: &str) -> Result<PathBuf> {
        validate_hash(hash)?;
        Ok(self.config.env_root(hash))
    }

    /// Installs `requirements` into the environment for `dir`, creating it
    /// on first success.
    pub async fn ensure(
        &self,
        dir: &Path,
        requirements: &[PackageRequirement],
    ) -> Result<(ProjectEnvironment, InstallReport)> {
        let (canonical, hash) = hash_dir(dir)?;
        let env_config = self.config.for_root(&self.config.env_root(&hash));
        let resolver = PkgxResolver::new(&env_config);
        self.ensure_with_resolver(&canonical, requirements, resolver)
            .await
    }

    pub async fn ensure_with_resolver<R: Resolve>(
        &self,
        dir: &Path,
        requirements: &[PackageRequirement],
        resolver: R,
    ) -> Result<(ProjectEnvironment, InstallReport)> {
        let (canonical, hash) = hash_dir(dir)?;
        let root = self.config.env_root(&hash);
        let existed = root.exists();
        debug!(
            "Ensuring environment {} for {} (exists: {})",
            hash,
            canonical.display(),
            existed
        );

        let installer = Installer::with_resolver(self.config.for_root(&root), resolver);
        let report = match installer.install(requirements).await {
            Ok(report) => report,
            Err(e) => {
                if !existed && root.exists() {
                    debug!("Install failed, removing new environment {}", root.display());
                    if let Err(rm) = lpad_fs::remove_directory_recursive(&root) {
                        warn!("Could not clean up {}: {}", root.display(), rm);
                    }
                }
                return Err(e);
            }
        };

        let metadata_path = root.join(METADATA_FILE);
        let mut metadata = match read_json::<EnvironmentMetadata>(&metadata_path) {
            Ok(existing) => existing,
            Err(_) => EnvironmentMetadata {
                project_dir: canonical.clone(),
                created_at: Utc::now(),
                env: Default::default(),
            },
        };
        let mut env = report.env.clone();
        env.remove("PATH");
        metadata.env.merge(&env);
        write_json(&metadata_path, &metadata)?;

        if !existed {
            debug!("Created environment {} for {}", hash, canonical.display());
        }
        Ok((self.load(&hash, &root)?, report))
    }

    /// Environment for `dir`, if one was created.
    pub fn find(&self, dir: &Path) -> Result<Option<ProjectEnvironment>> {
        let (_, hash) = hash_dir(dir)?;
        self.get(&hash)
    }

    pub fn get(&self, hash: &str) -> Result<Option<ProjectEnvironment>> {
        let root = self.root_for_hash(hash)?;
        if !root.is_dir() {
            return Ok(None);
        }
        self.load(hash, &root).map(Some)
    }

    /// Every immediate subdirectory of the base directory.
    pub fn list(&self) -> Result<Vec<ProjectEnvironment>> {
        let base = self.base_dir();
        if !base.is_dir() {
            return Ok(Vec::new());
        }
        let mut envs = Vec::new();
        for (name, path, is_dir) in lpad_fs::list_directory_entries(base)? {
            if !is_dir || name.starts_with('.') {
                continue;
            }
            match self.load(&name, &path) {
                Ok(env) => envs.push(env),
                Err(e) => warn!("Skipping environment {}: {}", path.display(), e),
            }
        }
        Ok(envs)
    }

    pub fn remove(&self, hash: &str) -> Result<()> {
        let root = self.root_for_hash(hash)?;
        if !root.is_dir() {
            return Err(LpadError::NotFound(format!("environment {hash}")));
        }
        debug!("Removing environment {}", root.display());
        lpad_fs::remove_directory_recursive(&root)
    }

    pub fn health(&self, hash: &str) -> Result<EnvironmentHealth> {
        let root = self.root_for_hash(hash)?;
        Ok(health_of(&root))
    }

    /// Removes every unhealthy environment, returning their hashes.
    pub fn clean(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for env in self.list()? {
            if health_of(&env.root_path).is_healthy() {
                continue;
            }
            self.remove(&env.hash)?;
            removed.push(env.hash);
        }
        Ok(removed)
    }

    /// Script that activates the environment of `dir` in the calling shell.
    pub fn activation(&self, dir: &Path) -> Result<String> {
        let (canonical, hash) = hash_dir(dir)?;
        let root = self.config.env_root(&hash);
        if !root.is_dir() {
            return Err(LpadError::NotFound(format!(
                "no environment for {} (run `lpad env ensure` first)",
                canonical.display()
            )));
        }
        let metadata: Option<EnvironmentMetadata> = read_json(&root.join(METADATA_FILE)).ok();
        let env = metadata.map(|m| m.env).unwrap_or_default();
        Ok(activation_script(&canonical, &root, &env))
    }

    fn load(&self, hash: &str, root: &Path) -> Result<ProjectEnvironment> {
        let metadata: Option<EnvironmentMetadata> = read_json(&root.join(METADATA_FILE)).ok();
        let registry = PackageRegistry::new(self.config.for_root(root));
        let packages = registry.list_installed()?;
        let created_at = match &metadata {
            Some(m) => m.created_at,
            None => fs::metadata(root)
                .and_then(|m| m.created().or_else(|_| m.modified()))
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
        };
        let project_dir = metadata.map(|m| m.project_dir);
        if let Some(dir) = &project_dir {
            if project_hash(dir) != hash {
                warn!(
                    "Environment {} records {} which hashes differently",
                    hash,
                    dir.display()
                );
            }
        }
        Ok(ProjectEnvironment {
            hash: hash.to_string(),
            root_path: root.to_path_buf(),
            project_dir,
            packages,
            created_at,
        })
    }
}

pub fn health_of(root: &Path) -> EnvironmentHealth {
    EnvironmentHealth {
        has_binaries: ["bin", "sbin"]
            .iter()
            .any(|d| lpad_fs::dir_has_entries(&root.join(d))),
        has_packages: lpad_fs::dir_has_entries(&root.join("pkgs")),
    }
}

fn validate_hash(hash: &str) -> Result<()> {
    let valid = !hash.is_empty()
        && !hash.starts_with('.')
        && hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(LpadError::Generic(format!("'{hash}' is not an environment hash")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(tmp: &Path) -> EnvironmentManager {
        EnvironmentManager::new(Config::with_root(tmp))
    }

    #[test]
    fn lists_and_checks_health() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = manager(tmp.path());
        let healthy = mgr.base_dir().join("app_0123");
        fs::create_dir_all(healthy.join("bin")).unwrap();
        fs::write(healthy.join("bin/tool"), "").unwrap();
        fs::create_dir_all(healthy.join("pkgs/example.com/v1.0.0")).unwrap();
        let empty = mgr.base_dir().join("gone_4567");
        fs::create_dir_all(empty.join("pkgs")).unwrap();

        let listed: Vec<String> = mgr.list().unwrap().into_iter().map(|e| e.hash).collect();
        assert_eq!(listed, vec!["app_0123".to_string(), "gone_4567".to_string()]);
        assert!(mgr.health("app_0123").unwrap().is_healthy());
        let health = mgr.health("gone_4567").unwrap();
        assert!(!health.has_binaries && !health.has_packages);

        assert_eq!(mgr.clean().unwrap(), vec!["gone_4567".to_string()]);
        assert!(!empty.exists());
        assert!(healthy.exists());
    }

    #[test]
    fn remove_rejects_path_like_hashes() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = manager(tmp.path());
        assert!(mgr.remove("../etc").is_err());
        assert!(matches!(mgr.remove("absent_00"), Err(LpadError::NotFound(_))));
    }

    #[test]
    fn activation_requires_an_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let mgr = manager(tmp.path());
        assert!(matches!(mgr.activation(&project), Err(LpadError::NotFound(_))));

        let hash = mgr.hash(&project).unwrap();
        fs::create_dir_all(mgr.base_dir().join(&hash).join("bin")).unwrap();
        let script = mgr.activation(&project).unwrap();
        assert!(script.contains("LPAD_ACTIVE_DIR"));
        assert!(script.contains(&hash));
    }
}
