// lpad-core/src/install/link.rs
//! Merges a mirrored package into the install root.
//!
//! Every top-level directory except `bin`/`sbin` (those get stubs) is merged
//! file by file: directories are created for real and each file becomes a
//! symlink into the package, so several packages can share `lib/`, `share/`
//! and friends.
use std::fs;
use std::path::{Path, PathBuf};

use lpad_aio::fs as lpad_fs;
use lpad_common::error::{LpadError, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories whose executables are exposed through stubs instead of links.
pub const STUB_DIRS: [&str; 2] = ["bin", "sbin"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub links: Vec<PathBuf>,
    /// Paths already owned by a real file; never overwritten.
    pub conflicts: Vec<PathBuf>,
}

pub fn link_package_tree(package_dir: &Path, install_root: &Path) -> Result<LinkReport> {
    debug!(
        "Linking {} into {}",
        package_dir.display(),
        install_root.display()
    );
    let mut report = LinkReport::default();

    for (name, source_subdir, is_dir) in lpad_fs::list_directory_entries(package_dir)? {
        if !is_dir || name.starts_with('.') || STUB_DIRS.contains(&name.as_str()) {
            continue;
        }
        let target_subdir = install_root.join(&name);
        for entry in WalkDir::new(&source_subdir).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| {
                LpadError::Filesystem(format!("walking {}: {}", source_subdir.display(), e))
            })?;
            let rel = entry
                .path()
                .strip_prefix(&source_subdir)
                .map_err(|e| LpadError::Filesystem(e.to_string()))?;
            let target = target_subdir.join(rel);

            if entry.file_type().is_dir() {
                ensure_real_dir(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                ensure_real_dir(parent)?;
            }
            if link_one(entry.path(), &target)? {
                report.links.push(target);
            } else {
                report.conflicts.push(target);
            }
        }
    }

    debug!(
        "Linked {} file(s) from {} ({} conflict(s))",
        report.links.len(),
        package_dir.display(),
        report.conflicts.len()
    );
    Ok(report)
}

/// A directory symlinked in by some other tool is left as is.
fn ensure_real_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    lpad_fs::create_dir_all(path)
}

fn link_one(source: &Path, target: &Path) -> Result<bool> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::read_link(target).ok().as_deref() == Some(source) {
                return Ok(true);
            }
            lpad_fs::remove_file(target)?;
        }
        Ok(_) => {
            warn!(
                "{} already exists and is not a link, not replacing it",
                target.display()
            );
            return Ok(false);
        }
        Err(_) => {}
    }
    lpad_fs::create_symlink(source, target)?;
    Ok(true)
}

/// Executables directly inside `package_dir/bin` and `package_dir/sbin`,
/// paired with the root directory their stubs belong in.
pub fn find_executables(package_dir: &Path, install_root: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut found = Vec::new();
    for dir in STUB_DIRS {
        let source = package_dir.join(dir);
        if !source.is_dir() {
            continue;
        }
        match lpad_fs::list_directory_entries(&source) {
            Ok(entries) => {
                for (name, path, is_dir) in entries {
                    if is_dir || name.starts_with('.') {
                        continue;
                    }
                    if lpad_fs::is_executable(&path) {
                        found.push((path, install_root.join(dir)));
                    } else {
                        debug!("Not executable, no stub: {}", path.display());
                    }
                }
            }
            Err(e) => warn!("Could not scan {}: {}", source.display(), e),
        }
    }
    found
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn merges_trees_and_respects_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("pkgs/zlib.net/v1.3.0");
        let root = tmp.path();
        fs::create_dir_all(pkg.join("lib/pkgconfig")).unwrap();
        fs::create_dir_all(pkg.join("bin")).unwrap();
        fs::write(pkg.join("lib/libz.a"), "a").unwrap();
        fs::write(pkg.join("lib/pkgconfig/zlib.pc"), "pc").unwrap();
        fs::write(pkg.join("bin/zpipe"), "x").unwrap();
        fs::create_dir_all(root.join("lib/pkgconfig")).unwrap();
        fs::write(root.join("lib/pkgconfig/zlib.pc"), "system copy").unwrap();

        let report = link_package_tree(&pkg, root).unwrap();
        assert_eq!(report.links, vec![root.join("lib/libz.a")]);
        assert_eq!(report.conflicts, vec![root.join("lib/pkgconfig/zlib.pc")]);
        assert_eq!(fs::read_link(root.join("lib/libz.a")).unwrap(), pkg.join("lib/libz.a"));
        assert_eq!(
            fs::read_to_string(root.join("lib/pkgconfig/zlib.pc")).unwrap(),
            "system copy"
        );
        assert!(!root.join("bin/zpipe").exists(), "bin is left to stubs");

        // Relinking is a no-op.
        let again = link_package_tree(&pkg, root).unwrap();
        assert_eq!(again.links, report.links);
    }

    #[test]
    fn finds_only_executables() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("pkg");
        fs::create_dir_all(pkg.join("bin")).unwrap();
        fs::create_dir_all(pkg.join("sbin")).unwrap();
        fs::write(pkg.join("bin/tool"), "x").unwrap();
        fs::set_permissions(pkg.join("bin/tool"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(pkg.join("bin/README"), "x").unwrap();
        fs::write(pkg.join("sbin/daemon"), "x").unwrap();
        fs::set_permissions(pkg.join("sbin/daemon"), fs::Permissions::from_mode(0o700)).unwrap();

        let found = find_executables(&pkg, Path::new("/root"));
        assert_eq!(
            found,
            vec![
                (pkg.join("bin/tool"), PathBuf::from("/root/bin")),
                (pkg.join("sbin/daemon"), PathBuf::from("/root/sbin")),
            ]
        );
    }
}
