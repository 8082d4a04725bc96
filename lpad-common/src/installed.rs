// lpad-common/src/installed.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::Config;
use super::error::Result;
use super::model::SemanticVersion;

/// A package version found on disk under `pkgs/<project>/v<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackageRecord {
    pub project: String,
    pub version: SemanticVersion,
    pub path: PathBuf,
}

/// Read-only view over an install root's `pkgs/` directory. Nothing is
/// cached; every call rescans the filesystem.
#[derive(Debug)]
pub struct PackageRegistry {
    config: Config,
}

impl PackageRegistry {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn pkgs_path(&self) -> PathBuf {
        self.config.pkgs_dir()
    }

    /// Installed versions of one project, newest first.
    pub fn installed_versions(&self, project: &str) -> Result<Vec<InstalledPackageRecord>> {
        let shelf = self.config.shelf_path(project);
        debug!(
            "[PKG_REGISTRY:{}] installed_versions: scanning {}",
            project,
            shelf.display()
        );
        if !shelf.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&shelf)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        "[PKG_REGISTRY:{}] Error reading entry in '{}': {}. Skipping.",
                        project,
                        shelf.display(),
                        e
                    );
                    continue;
                }
            };
            // Major-version aliases are symlinks; only real directories count.
            let is_real_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_real_dir {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with('v') {
                continue;
            }
            match SemanticVersion::parse(name) {
                Ok(version) => records.push(InstalledPackageRecord {
                    project: project.to_string(),
                    version,
                    path: entry.path(),
                }),
                Err(_) => debug!(
                    "[PKG_REGISTRY:{}] '{}' is not a version directory",
                    project, name
                ),
            }
        }
        records.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(records)
    }

    pub fn latest(&self, project: &str) -> Result<Option<InstalledPackageRecord>> {
        Ok(self.installed_versions(project)?.into_iter().next())
    }

    /// Every installed version of every project, sorted by project then version.
    pub fn list_installed(&self) -> Result<Vec<InstalledPackageRecord>> {
        let pkgs_dir = self.pkgs_path();
        debug!(
            "[PKG_REGISTRY] list_installed: Scanning {}",
            pkgs_dir.display()
        );
        if !pkgs_dir.is_dir() {
            debug!("[PKG_REGISTRY] list_installed: pkgs directory NOT FOUND. Returning empty list.");
            return Ok(Vec::new());
        }

        let mut installed = Vec::new();
        for project in self.projects()? {
            match self.installed_versions(&project) {
                Ok(mut versions) => {
                    versions.reverse();
                    installed.extend(versions);
                }
                Err(e) => warn!(
                    "[PKG_REGISTRY:{}] list_installed: failed to read versions: {}",
                    project, e
                ),
            }
        }
        debug!(
            "[PKG_REGISTRY] list_installed: Found {} installed package versions.",
            installed.len()
        );
        Ok(installed)
    }

    /// Project names present under `pkgs/`. Projects may be nested
    /// (`github.com/user/repo`), so every directory that directly holds a
    /// version directory counts.
    pub fn projects(&self) -> Result<Vec<String>> {
        let pkgs_dir = self.pkgs_path();
        let mut projects = Vec::new();
        if !pkgs_dir.is_dir() {
            return Ok(projects);
        }
        collect_projects(&pkgs_dir, &pkgs_dir, &mut projects)?;
        projects.sort();
        Ok(projects)
    }
}

fn collect_projects(base: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    let mut holds_versions = false;
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if SemanticVersion::parse(&name).is_ok() && name.starts_with('v') {
            holds_versions = true;
        } else if !name.starts_with('.') {
            children.push(entry.path());
        }
    }
    if holds_versions && dir != base {
        if let Ok(rel) = dir.strip_prefix(base) {
            out.push(rel.to_string_lossy().to_string());
        }
    }
    for child in children {
        collect_projects(base, &child, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkdir(root: &Path, rel: &str) {
        fs::create_dir_all(root.join(rel)).unwrap();
    }

    #[test]
    fn scans_versions_and_ignores_aliases() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        mkdir(tmp.path(), "pkgs/curl.se/v8.0.1");
        mkdir(tmp.path(), "pkgs/curl.se/v8.5.0");
        mkdir(tmp.path(), "pkgs/curl.se/notes");
        #[cfg(unix)]
        std::os::unix::fs::symlink("v8.5.0", tmp.path().join("pkgs/curl.se/v8")).unwrap();

        let registry = PackageRegistry::new(config);
        let versions = registry.installed_versions("curl.se").unwrap();
        let raw: Vec<_> = versions.iter().map(|r| r.version.raw.as_str()).collect();
        assert_eq!(raw, vec!["8.5.0", "8.0.1"]);
        assert_eq!(
            registry.latest("curl.se").unwrap().unwrap().version.raw,
            "8.5.0"
        );
    }

    #[test]
    fn lists_nested_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        mkdir(tmp.path(), "pkgs/nodejs.org/v20.1.0");
        mkdir(tmp.path(), "pkgs/github.com/cli/cli/v2.40.0");

        let registry = PackageRegistry::new(config);
        assert_eq!(
            registry.projects().unwrap(),
            vec!["github.com/cli/cli".to_string(), "nodejs.org".to_string()]
        );
        assert_eq!(registry.list_installed().unwrap().len(), 2);
    }

    #[test]
    fn missing_pkgs_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = PackageRegistry::new(Config::with_root(tmp.path()));
        assert!(registry.list_installed().unwrap().is_empty());
    }
}
