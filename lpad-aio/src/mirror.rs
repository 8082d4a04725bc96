// lpad-aio/src/mirror.rs
//! Recreates a package tree inside the managed prefix.
//!
//! Regular files are hard-linked (falling back to a byte copy when linking
//! fails, e.g. across filesystems), directories are recreated and symlinks are
//! copied verbatim so relative targets keep pointing inside the tree.
use std::fs;
use std::io;
use std::path::Path;

use lpad_common::error::{LpadError, Result};
use tracing::{debug, error};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MirrorStats {
    pub dirs: usize,
    pub hard_links: usize,
    pub copies: usize,
    pub symlinks: usize,
}

/// Hard-links `src` to `dest`, copying the bytes if the link cannot be made.
/// Returns `true` when a hard link was created.
pub fn hard_link_or_copy(src: &Path, dest: &Path) -> Result<bool> {
    match fs::hard_link(src, dest) {
        Ok(()) => Ok(true),
        Err(link_err) => {
            debug!(
                "Hard link {} -> {} failed ({}), copying instead",
                dest.display(),
                src.display(),
                link_err
            );
            fs::copy(src, dest).map_err(|e| {
                error!("Failed copy {} -> {}: {}", src.display(), dest.display(), e);
                fs_error("copy", src, e)
            })?;
            Ok(false)
        }
    }
}

/// Mirrors the contents of `src` into the existing directory `dest`.
pub fn mirror_tree(src: &Path, dest: &Path) -> Result<MirrorStats> {
    if !src.is_dir() {
        return Err(LpadError::PackageNotFound(format!(
            "package source {} does not exist",
            src.display()
        )));
    }
    debug!("Mirroring {} -> {}", src.display(), dest.display());

    let mut stats = MirrorStats::default();
    // Directory modes are restored last so read-only dirs can still be filled.
    let mut dir_modes = Vec::new();

    for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            LpadError::Filesystem(format!("walking {}: {}", src.display(), e))
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| LpadError::Filesystem(e.to_string()))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link_target =
                fs::read_link(entry.path()).map_err(|e| fs_error("readlink", entry.path(), e))?;
            crate::fs::create_symlink(&link_target, &target)?;
            stats.symlinks += 1;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| fs_error("mkdir", &target, e))?;
            if let Ok(meta) = entry.metadata() {
                dir_modes.push((target, meta.permissions()));
            }
            stats.dirs += 1;
        } else if hard_link_or_copy(entry.path(), &target)? {
            stats.hard_links += 1;
        } else {
            stats.copies += 1;
        }
    }

    for (dir, perms) in dir_modes.into_iter().rev() {
        if let Err(e) = fs::set_permissions(&dir, perms) {
            debug!("Could not restore mode on {}: {}", dir.display(), e);
        }
    }

    debug!(
        "Mirrored {}: {} dirs, {} hard links, {} copies, {} symlinks",
        src.display(),
        stats.dirs,
        stats.hard_links,
        stats.copies,
        stats.symlinks
    );
    Ok(stats)
}

/// Mirrors `src` into a staging directory next to `dest` and renames it into
/// place, so `dest` only ever appears complete. `dest` must not exist.
pub fn mirror_staged(src: &Path, dest: &Path) -> Result<MirrorStats> {
    let parent = dest.parent().ok_or_else(|| {
        LpadError::Filesystem(format!("{} has no parent directory", dest.display()))
    })?;
    crate::fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)
        .map_err(|e| fs_error("create staging dir in", parent, e))?;

    let stats = mirror_tree(src, staging.path())?;
    if let Ok(meta) = fs::metadata(src) {
        let _ = fs::set_permissions(staging.path(), meta.permissions());
    }

    let staged = staging.keep();
    if let Err(e) = fs::rename(&staged, dest) {
        let _ = fs::remove_dir_all(&staged);
        return Err(fs_error("rename staged tree to", dest, e));
    }
    Ok(stats)
}

fn fs_error(op: &str, path: &Path, err: io::Error) -> LpadError {
    LpadError::Filesystem(format!("{op} {}: {err}", path.display()))
}
