// lpad-core/src/check/installed.rs
use std::fs;
use std::path::PathBuf;

use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_common::installed::PackageRegistry;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct InstalledPackageInfo {
    pub project: String,
    pub version: String,
    pub path: PathBuf,
    /// `v<major>` link on the shelf that currently selects this version.
    pub major_link: Option<String>,
}

/// Scans `pkgs/` of the configured root. Always reads the filesystem.
pub fn get_installed_packages(config: &Config) -> Result<Vec<InstalledPackageInfo>> {
    let registry = PackageRegistry::new(config.clone());
    let mut installed = Vec::new();
    for record in registry.list_installed()? {
        let link_name = format!("v{}", record.version.major);
        let link_path = config.shelf_path(&record.project).join(&link_name);
        let selected = fs::read_link(&link_path)
            .map(|target| target.as_os_str() == record.version.dir_name().as_str())
            .unwrap_or(false);
        installed.push(InstalledPackageInfo {
            project: record.project,
            version: record.version.to_string(),
            path: record.path,
            major_link: selected.then_some(link_name),
        });
    }
    debug!("Found {} installed package(s)", installed.len());
    Ok(installed)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn marks_the_version_behind_the_major_link() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        let shelf = config.shelf_path("curl.se");
        fs::create_dir_all(shelf.join("v8.0.1")).unwrap();
        fs::create_dir_all(shelf.join("v8.5.0")).unwrap();
        std::os::unix::fs::symlink("v8.5.0", shelf.join("v8")).unwrap();

        let packages = get_installed_packages(&config).unwrap();
        let summary: Vec<(String, Option<String>)> = packages
            .into_iter()
            .map(|p| (p.version, p.major_link))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("8.0.1".to_string(), None),
                ("8.5.0".to_string(), Some("v8".to_string()))
            ]
        );
    }
}
