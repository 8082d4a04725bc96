// lpad-core/src/install/shelf.rs
//! Major-version symlinks on a project shelf (`pkgs/<project>/v<major>`).
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lpad_aio::fs as lpad_fs;
use lpad_common::error::{LpadError, Result};
use lpad_common::model::SemanticVersion;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymlinkReport {
    /// `(link name, target dir name)`
    pub linked: Vec<(String, String)>,
    /// Link names occupied by something that is not a symlink.
    pub skipped: Vec<String>,
}

/// Picks the winner for each major line: the highest stable version, or the
/// highest prerelease if the line has no stable release at all.
pub fn select_major_targets(versions: &[SemanticVersion]) -> BTreeMap<u64, &SemanticVersion> {
    let mut groups: BTreeMap<u64, Vec<&SemanticVersion>> = BTreeMap::new();
    for version in versions {
        groups.entry(version.major).or_default().push(version);
    }
    groups
        .into_iter()
        .filter_map(|(major, members)| {
            let stable = members.iter().copied().filter(|v| !v.is_prerelease()).max();
            stable
                .or_else(|| members.iter().copied().max())
                .map(|winner| (major, winner))
        })
        .collect()
}

/// Refreshes every `v<major>` link on the shelf holding `installed_version_path`.
pub fn update_major_symlinks(installed_version_path: &Path) -> Result<SymlinkReport> {
    let shelf = installed_version_path.parent().ok_or_else(|| {
        LpadError::Filesystem(format!(
            "{} has no shelf directory",
            installed_version_path.display()
        ))
    })?;
    debug!("Updating major version links in {}", shelf.display());

    let mut found: Vec<(SemanticVersion, String)> = Vec::new();
    for (name, path, is_dir) in lpad_fs::list_directory_entries(shelf)? {
        if !is_dir || lpad_fs::is_symlink(&path) {
            continue;
        }
        match SemanticVersion::parse(&name) {
            Ok(version) => found.push((version, name)),
            Err(_) => debug!("Ignoring non-version entry {}", path.display()),
        }
    }

    let versions: Vec<SemanticVersion> = found.iter().map(|(v, _)| v.clone()).collect();
    let mut report = SymlinkReport::default();
    for (major, winner) in select_major_targets(&versions) {
        let Some((_, dir_name)) = found.iter().find(|(v, _)| v == winner) else {
            continue;
        };
        let link_name = format!("v{major}");
        let link_path = shelf.join(&link_name);
        if point_link(&link_path, dir_name)? {
            report.linked.push((link_name, dir_name.clone()));
        } else {
            report.skipped.push(link_name);
        }
    }
    Ok(report)
}

/// Returns `false` when a real file or directory owns the link name.
fn point_link(link_path: &Path, dir_name: &str) -> Result<bool> {
    let target = PathBuf::from(dir_name);
    match fs::symlink_metadata(link_path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::read_link(link_path).ok().as_deref() == Some(target.as_path()) {
                return Ok(true);
            }
            lpad_fs::remove_file(link_path)?;
        }
        Ok(_) => {
            warn!(
                "{} exists and is not a symlink, leaving it alone",
                link_path.display()
            );
            return Ok(false);
        }
        Err(_) => {}
    }
    lpad_fs::create_symlink(&target, link_path)?;
    debug!("Linked {} -> {}", link_path.display(), dir_name);
    Ok(true)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn stable_release_wins_over_newer_prerelease() {
        let versions = vec![v("1.0.0"), v("1.1.0"), v("1.2.0-beta.1"), v("2.0.0")];
        let picked = select_major_targets(&versions);
        assert_eq!(picked[&1].raw, "1.1.0");
        assert_eq!(picked[&2].raw, "2.0.0");
    }

    #[test]
    fn prerelease_only_line_still_gets_a_link() {
        let versions = vec![v("3.0.0-alpha"), v("3.0.0-rc.1")];
        assert_eq!(select_major_targets(&versions)[&3].raw, "3.0.0-rc.1");
    }

    #[test]
    fn links_shelf_by_relative_name() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = tmp.path().join("pkgs/example.com");
        for dir in ["v1.0.0", "v1.1.0", "v1.2.0-beta.1", "v2.0.0", "notes"] {
            fs::create_dir_all(shelf.join(dir)).unwrap();
        }
        // Stale link from an earlier run.
        std::os::unix::fs::symlink("v1.0.0", shelf.join("v1")).unwrap();

        let report = update_major_symlinks(&shelf.join("v2.0.0")).unwrap();
        assert_eq!(
            report.linked,
            vec![
                ("v1".to_string(), "v1.1.0".to_string()),
                ("v2".to_string(), "v2.0.0".to_string())
            ]
        );
        assert_eq!(fs::read_link(shelf.join("v1")).unwrap(), Path::new("v1.1.0"));
        assert_eq!(fs::read_link(shelf.join("v2")).unwrap(), Path::new("v2.0.0"));
        assert!(!shelf.join("vnotes").exists());
    }

    #[test]
    fn real_directory_with_link_name_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = tmp.path().join("pkgs/example.com");
        fs::create_dir_all(shelf.join("v3.0.0")).unwrap();
        fs::create_dir_all(shelf.join("v3")).unwrap();

        let report = update_major_symlinks(&shelf.join("v3.0.0")).unwrap();
        assert_eq!(report.skipped, vec!["v3".to_string()]);
        assert!(shelf.join("v3").is_dir());
        assert!(!lpad_fs::is_symlink(&shelf.join("v3")));
    }
}
